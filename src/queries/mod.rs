//! SQL statement builders (sea-query, SQLite dialect)
//!
//! Each function returns a complete SQL string with values inlined.

pub mod bookings;
pub mod catalog;
pub mod ddl;
pub mod metadata;
pub mod pages;
pub mod site;
