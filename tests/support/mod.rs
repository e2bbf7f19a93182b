#![allow(dead_code)]

pub mod churnguard_env;
pub mod fixtures;
