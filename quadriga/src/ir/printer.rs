//! Text rendering of quadruple listings.
//!
//! One instruction per line, `"<opcode> <op1>, <op2>, <op3>"`, absent
//! operands rendered as `-`. Debug dumps and golden tests rely on this form.

use std::fmt;

use super::{Opcode, Operand, Quad};

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => f.write_str("-"),
            Operand::Temp(index) => write!(f, "t{}", index),
            Operand::Name(text) | Operand::Label(text) | Operand::Lit(text) => f.write_str(text),
        }
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}, {}, {}", self.op, self.a, self.b, self.c)
    }
}

/// Render a whole listing.
pub fn render(code: &[Quad]) -> String {
    code.iter()
        .map(Quad::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
