//! # Route Module
//!
//! Route definitions and registration. A [`Route`] ties a URI template
//! to a handler id, a constraint list, and middleware bindings; a
//! [`RouteCollection`] is the ordered set the trie compiler consumes.
//!
//! Routes reference handlers by [`HandlerId`] rather than by function
//! pointer so the compiled form can be cached on disk. Resolving ids to
//! callables is the application's job, typically through a
//! [`HandlerRegistry`](crate::registry::HandlerRegistry).
//!
//! ## Example
//!
//! ```rust
//! use routrie::route::{RouteBuilder, RouteCollection};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut routes = RouteCollection::new();
//! routes.add(RouteBuilder::get("/users/:id(int)", "users.show").build()?);
//! routes.add(RouteBuilder::post("/users", "users.create").build()?);
//! routes.add(
//!     RouteBuilder::get("/books/:bookId[/chapters/:chapterId]", "books.chapters").build()?,
//! );
//! assert_eq!(routes.len(), 3);
//! # Ok(())
//! # }
//! ```

pub mod constraints;
mod core;

pub use constraints::{Constraint, RouteConstraint};
pub use core::{HandlerId, MiddlewareBinding, Route, RouteBuilder, RouteCollection, UriTemplate};
