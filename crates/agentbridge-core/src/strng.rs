//! A cheaply-clonable, interned-style string used pervasively for names that are
//! compared and copied far more often than they are built: backend names, model
//! names, provider names, header names.
//!
//! Backed by `arcstr::ArcStr`, which is reference-counted and can be constructed
//! from a `'static` literal at compile time with no allocation.

use std::fmt;

pub type Strng = arcstr::ArcStr;

/// Build a `Strng` from a runtime `&str`, cloning into a fresh allocation.
pub fn new(s: impl AsRef<str>) -> Strng {
	Strng::from(s.as_ref())
}

/// Const-construct a `Strng` from a `'static` string literal with no allocation.
#[macro_export]
macro_rules! literal {
	($s:expr) => {
		arcstr::literal!($s)
	};
}

pub use literal;

pub fn display(s: &Strng) -> impl fmt::Display + '_ {
	s.as_str()
}
