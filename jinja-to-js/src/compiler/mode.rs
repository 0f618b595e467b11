//! Output modes
//!
//! The buffer is always in one of three modes. In `Default` mode template
//! text is appended as `__result += "...";` statements. An interpolation
//! region appends the value of an expression; an execution region holds
//! plain statements such as `if (...) {`.
//!
//! Only the outermost entry into a region writes its delimiters. Nested
//! entries get a [`Region`] that was never opened, so closing it does
//! nothing and the enclosing owner closes the region instead.

use super::Compiler;
use crate::runtime::Helper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Mode {
    Default,
    Executing,
    Interpolating { safe: bool },
}

/// Handle returned when entering a region.
#[derive(Debug)]
#[must_use = "a region must be closed with `Compiler::exit`"]
pub(super) struct Region {
    opened: bool,
}

impl Compiler<'_> {
    /// Start appending an expression's value. `safe` skips HTML escaping.
    pub(super) fn enter_interpolation(&mut self, safe: bool) -> Region {
        if self.mode != Mode::Default {
            return Region { opened: false };
        }
        if safe {
            self.write("__result += ((__tmp = (");
        } else {
            self.use_helper(Helper::Escape);
            self.write("__result += __escape(");
        }
        self.mode = Mode::Interpolating { safe };
        Region { opened: true }
    }

    pub(super) fn enter_execution(&mut self) -> Region {
        if self.mode != Mode::Default {
            return Region { opened: false };
        }
        self.mode = Mode::Executing;
        Region { opened: true }
    }

    /// Close `region` if it was opened and is still open.
    pub(super) fn exit(&mut self, region: &mut Region) {
        if !region.opened {
            return;
        }
        region.opened = false;

        match self.mode {
            Mode::Interpolating { safe: true } => self.write(")) == null ? \"\" : __tmp);\n"),
            Mode::Interpolating { safe: false } => self.write(");\n"),
            Mode::Executing => self.write("\n"),
            Mode::Default => {}
        }
        self.mode = Mode::Default;
    }

    /// Run `f` in `Default` mode, then return to the current mode. Used to
    /// render statements inside an expression.
    pub(super) fn in_default_mode<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = std::mem::replace(&mut self.mode, Mode::Default);
        let result = f(self);
        self.mode = previous;
        result
    }
}
