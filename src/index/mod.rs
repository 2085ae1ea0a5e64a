//! Index structures built on the buffer pool.

pub mod btree;
