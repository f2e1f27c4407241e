#![allow(dead_code)]

pub use webcli_test_utils::*;
