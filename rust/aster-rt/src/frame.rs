//! Environment frames: the unit of name resolution.

use crate::values::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type FrameRef = Rc<RefCell<Frame>>;

/// A lexically scoped environment node with an optional parent link.
///
/// Frames are shared by reference: a closure keeps its captured frame alive
/// for as long as the closure itself lives. A closure stored in a variable
/// of the frame it captured forms a reference cycle; such frames are only
/// reclaimed when the interpreter is dropped, which the language permits.
#[derive(Debug, Default)]
pub struct Frame {
    vars: HashMap<String, Value>,
    parent: Option<FrameRef>,
}

impl Frame {
    /// A root frame with no parent.
    pub fn root() -> FrameRef {
        Rc::new(RefCell::new(Frame::default()))
    }

    /// A child frame for a block, call or closure body.
    pub fn child(parent: &FrameRef) -> FrameRef {
        Rc::new(RefCell::new(Frame {
            vars: HashMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    /// Bind a name in this frame, shadowing any outer binding.
    pub fn define(frame: &FrameRef, name: &str, value: Value) {
        frame.borrow_mut().vars.insert(name.to_string(), value);
    }

    /// Resolve a name by walking parent links.
    pub fn lookup(frame: &FrameRef, name: &str) -> Option<Value> {
        let mut cur = Rc::clone(frame);
        loop {
            if let Some(v) = cur.borrow().vars.get(name) {
                return Some(v.clone());
            }
            let parent = cur.borrow().parent.clone();
            match parent {
                Some(p) => cur = p,
                None => return None,
            }
        }
    }

    /// Write to the closest frame already holding `name`. Returns false when
    /// no enclosing frame has the binding.
    pub fn assign(frame: &FrameRef, name: &str, value: Value) -> bool {
        let mut cur = Rc::clone(frame);
        loop {
            if let Some(slot) = cur.borrow_mut().vars.get_mut(name) {
                *slot = value;
                return true;
            }
            let parent = cur.borrow().parent.clone();
            match parent {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// The names bound directly in this frame, sorted (for the REPL).
    pub fn local_names(frame: &FrameRef) -> Vec<String> {
        let mut names: Vec<String> = frame.borrow().vars.keys().cloned().collect();
        names.sort();
        names
    }
}
