//! Parties domain module: the customers sales are recorded against.
//!
//! Customers carry no stock behaviour; they are referenced by sales and hold
//! the running debt charged by those sales.

pub mod customer;

pub use customer::{Customer, CustomerDetails};
