//! Host-side description of exported function signatures.
//!
//! These shapes are independent of any particular engine's type
//! representation so contracts can be declared as plain data and compared
//! against what a component actually exports.

use std::fmt;

/// The shape of a value crossing the host/guest boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueShape {
  Bool,
  U8,
  U32,
  S32,
  U64,
  S64,
  String,
  /// `list<u8>`, the payload carrier.
  Bytes,
  List(Box<ValueShape>),
  Option(Box<ValueShape>),
  Result {
    ok: Option<Box<ValueShape>>,
    err: Option<Box<ValueShape>>,
  },
  /// Anything the host never marshals; kept by name for diagnostics.
  Other(String),
}

impl ValueShape {
  pub fn result(ok: Option<ValueShape>, err: Option<ValueShape>) -> Self {
    Self::Result {
      ok: ok.map(Box::new),
      err: err.map(Box::new),
    }
  }
}

impl fmt::Display for ValueShape {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Bool => f.write_str("bool"),
      Self::U8 => f.write_str("u8"),
      Self::U32 => f.write_str("u32"),
      Self::S32 => f.write_str("s32"),
      Self::U64 => f.write_str("u64"),
      Self::S64 => f.write_str("s64"),
      Self::String => f.write_str("string"),
      Self::Bytes => f.write_str("list<u8>"),
      Self::List(inner) => write!(f, "list<{}>", inner),
      Self::Option(inner) => write!(f, "option<{}>", inner),
      Self::Result { ok, err } => match (ok, err) {
        (Some(ok), Some(err)) => write!(f, "result<{}, {}>", ok, err),
        (Some(ok), None) => write!(f, "result<{}>", ok),
        (None, Some(err)) => write!(f, "result<_, {}>", err),
        (None, None) => f.write_str("result"),
      },
      Self::Other(name) => f.write_str(name),
    }
  }
}

/// Parameter and result shapes of a function. Parameter names are not part
/// of the signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
  pub params: Vec<ValueShape>,
  pub results: Vec<ValueShape>,
}

impl FunctionSignature {
  pub fn new(params: Vec<ValueShape>, results: Vec<ValueShape>) -> Self {
    Self { params, results }
  }

  /// `func(payload: list<u8>) -> result<list<u8>, string>`, shared by every
  /// trigger handler.
  pub fn handler() -> Self {
    Self::new(
      vec![ValueShape::Bytes],
      vec![ValueShape::result(
        Some(ValueShape::Bytes),
        Some(ValueShape::String),
      )],
    )
  }
}

impl fmt::Display for FunctionSignature {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("func(")?;
    for (i, param) in self.params.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{}", param)?;
    }
    f.write_str(")")?;
    match self.results.as_slice() {
      [] => Ok(()),
      [single] => write!(f, " -> {}", single),
      many => {
        f.write_str(" -> (")?;
        for (i, result) in many.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{}", result)?;
        }
        f.write_str(")")
      }
    }
  }
}
