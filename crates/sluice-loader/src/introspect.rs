//! Reading exported and imported interfaces from a compiled component.

use sluice_world::{FunctionSignature, ValueShape};
use wasmtime::Engine;
use wasmtime::component::Component;
use wasmtime::component::types::{ComponentFunc, ComponentItem, Type};

/// A function a component exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFunction {
  /// Name of the exported instance the function lives in, or empty for a
  /// function exported at the top level.
  pub interface: String,
  pub name: String,
  pub signature: FunctionSignature,
}

/// Every function the component exports, one level of instances deep.
pub(crate) fn exported_functions(engine: &Engine, component: &Component) -> Vec<ExportedFunction> {
  let mut functions = Vec::new();
  for (export_name, item) in component.component_type().exports(engine) {
    match item {
      ComponentItem::ComponentFunc(func) => functions.push(ExportedFunction {
        interface: String::new(),
        name: export_name.to_string(),
        signature: signature(&func),
      }),
      ComponentItem::ComponentInstance(instance) => {
        for (name, item) in instance.exports(engine) {
          if let ComponentItem::ComponentFunc(func) = item {
            functions.push(ExportedFunction {
              interface: export_name.to_string(),
              name: name.to_string(),
              signature: signature(&func),
            });
          }
        }
      }
      _ => {}
    }
  }
  functions
}

/// Names of exported instances.
pub(crate) fn exported_instances(engine: &Engine, component: &Component) -> Vec<String> {
  component
    .component_type()
    .exports(engine)
    .filter(|(_, item)| matches!(item, ComponentItem::ComponentInstance(_)))
    .map(|(name, _)| name.to_string())
    .collect()
}

/// Import names, with whether each import is an instance.
pub(crate) fn imports(engine: &Engine, component: &Component) -> Vec<(String, bool)> {
  component
    .component_type()
    .imports(engine)
    .map(|(name, item)| {
      (
        name.to_string(),
        matches!(item, ComponentItem::ComponentInstance(_)),
      )
    })
    .collect()
}

fn signature(func: &ComponentFunc) -> FunctionSignature {
  FunctionSignature::new(
    func.params().map(|(_, ty)| shape(&ty)).collect(),
    func.results().map(|ty| shape(&ty)).collect(),
  )
}

fn shape(ty: &Type) -> ValueShape {
  match ty {
    Type::Bool => ValueShape::Bool,
    Type::U8 => ValueShape::U8,
    Type::U32 => ValueShape::U32,
    Type::S32 => ValueShape::S32,
    Type::U64 => ValueShape::U64,
    Type::S64 => ValueShape::S64,
    Type::String => ValueShape::String,
    Type::List(list) => match list.ty() {
      Type::U8 => ValueShape::Bytes,
      inner => ValueShape::List(Box::new(shape(&inner))),
    },
    Type::Option(option) => ValueShape::Option(Box::new(shape(&option.ty()))),
    Type::Result(result) => ValueShape::result(
      result.ok().map(|ty| shape(&ty)),
      result.err().map(|ty| shape(&ty)),
    ),
    other => ValueShape::Other(format!("{:?}", other)),
  }
}
