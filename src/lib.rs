pub mod error;
pub mod hash;
pub mod key;
pub mod ring;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;
