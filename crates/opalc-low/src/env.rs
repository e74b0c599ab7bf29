//! Lexically-scoped symbol table.
//!
//! The environment is a stack of frames; each frame maps a name to a
//! [`Binding`]. `define` writes only into the current frame (shadowing or
//! overwriting); `lookup` walks outward to the module root. There is no
//! delete. Frame lifetime is stack-disciplined with respect to function
//! lowering: a frame is pushed on function entry and popped on exit.

use inkwell::values::{FunctionValue, PointerValue};
use rustc_hash::FxHashMap;

use opalc_par::Ty;

/// What kind of scope a frame belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// The module root; holds built-ins and module-level variables.
    Module,
    /// One function body.
    Function,
}

/// A named value visible in some scope.
#[derive(Clone, Copy, Debug)]
pub enum Binding<'ctx> {
    /// A mutable storage slot: an alloca, or a module global for
    /// module-scope variables.
    Slot {
        ptr: PointerValue<'ctx>,
        ty: Ty,
    },
    /// A callable function and its return type.
    Function {
        value: FunctionValue<'ctx>,
        ret: Ty,
    },
}

/// One scope frame.
struct Frame<'ctx> {
    kind: FrameKind,
    bindings: FxHashMap<String, Binding<'ctx>>,
}

/// The scope stack.
pub struct Environment<'ctx> {
    frames: Vec<Frame<'ctx>>,
}

impl<'ctx> Environment<'ctx> {
    /// Creates an environment with the module root frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame {
                kind: FrameKind::Module,
                bindings: FxHashMap::default(),
            }],
        }
    }

    /// Pushes a new frame of the given kind.
    pub fn push_frame(&mut self, kind: FrameKind) {
        self.frames.push(Frame {
            kind,
            bindings: FxHashMap::default(),
        });
    }

    /// Pops the innermost frame. The module root is never popped.
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Defines `name` in the current frame, shadowing any outer binding and
    /// overwriting any previous binding in this frame.
    pub fn define(&mut self, name: impl Into<String>, binding: Binding<'ctx>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.bindings.insert(name.into(), binding);
        }
    }

    /// Walks the frame stack from innermost to root. Returns the binding
    /// and the index of the frame it was found in.
    pub fn lookup(&self, name: &str) -> Option<(Binding<'ctx>, usize)> {
        for (index, frame) in self.frames.iter().enumerate().rev() {
            if let Some(binding) = frame.bindings.get(name) {
                return Some((*binding, index));
            }
        }
        None
    }

    /// Looks up `name` in the current frame only.
    pub fn lookup_local(&self, name: &str) -> Option<Binding<'ctx>> {
        self.frames
            .last()
            .and_then(|frame| frame.bindings.get(name))
            .copied()
    }

    /// Index of the innermost frame.
    pub fn current_index(&self) -> usize {
        self.frames.len() - 1
    }

    /// The kind of the frame at `index`.
    pub fn frame_kind(&self, index: usize) -> FrameKind {
        self.frames[index].kind
    }

    /// True while lowering module-level code (no function frame pushed).
    pub fn in_module_frame(&self) -> bool {
        self.frames.len() == 1
    }
}

impl<'ctx> Default for Environment<'ctx> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context;

    #[test]
    fn test_define_and_lookup() {
        let context = Context::create();
        let builder = context.create_builder();
        let module = context.create_module("t");
        let fn_type = context.i64_type().fn_type(&[], false);
        let function = module.add_function("f", fn_type, None);
        let entry = context.append_basic_block(function, "entry");
        builder.position_at_end(entry);
        let ptr = builder.build_alloca(context.i64_type(), "x").unwrap();

        let mut env = Environment::new();
        env.define("x", Binding::Slot { ptr, ty: Ty::Int });

        let (binding, index) = env.lookup("x").expect("x is defined");
        assert_eq!(index, 0);
        assert!(matches!(binding, Binding::Slot { ty: Ty::Int, .. }));
        assert!(env.lookup("y").is_none());
    }

    #[test]
    fn test_lookup_walks_parent_chain() {
        let context = Context::create();
        let builder = context.create_builder();
        let module = context.create_module("t");
        let fn_type = context.i64_type().fn_type(&[], false);
        let function = module.add_function("f", fn_type, None);
        builder.position_at_end(context.append_basic_block(function, "entry"));
        let ptr = builder.build_alloca(context.i64_type(), "x").unwrap();

        let mut env = Environment::new();
        env.define("x", Binding::Slot { ptr, ty: Ty::Int });
        env.push_frame(FrameKind::Function);

        // Visible from the inner frame, found in the module frame.
        let (_, index) = env.lookup("x").expect("outer x visible");
        assert_eq!(index, 0);
        assert!(env.lookup_local("x").is_none());
    }

    #[test]
    fn test_shadowing_is_per_frame() {
        let context = Context::create();
        let builder = context.create_builder();
        let module = context.create_module("t");
        let fn_type = context.i64_type().fn_type(&[], false);
        let function = module.add_function("f", fn_type, None);
        builder.position_at_end(context.append_basic_block(function, "entry"));
        let outer = builder.build_alloca(context.i64_type(), "x").unwrap();
        let inner = builder.build_alloca(context.f64_type(), "x").unwrap();

        let mut env = Environment::new();
        env.define("x", Binding::Slot { ptr: outer, ty: Ty::Int });
        env.push_frame(FrameKind::Function);
        env.define("x", Binding::Slot { ptr: inner, ty: Ty::Float });

        let (binding, index) = env.lookup("x").unwrap();
        assert_eq!(index, 1);
        assert!(matches!(binding, Binding::Slot { ty: Ty::Float, .. }));

        env.pop_frame();
        let (binding, _) = env.lookup("x").unwrap();
        assert!(matches!(binding, Binding::Slot { ty: Ty::Int, .. }));
    }

    #[test]
    fn test_module_root_is_never_popped() {
        let mut env = Environment::new();
        env.pop_frame();
        env.pop_frame();
        assert!(env.in_module_frame());
        assert_eq!(env.frame_kind(0), FrameKind::Module);
    }
}
