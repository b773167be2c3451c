#![allow(missing_docs)]

mod health;
mod shutdown;
mod startup;

const fn main() {}
