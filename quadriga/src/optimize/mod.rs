//! Quadruple optimization passes.
//!
//! Five rewrite passes run in a fixed order; each pass's preconditions depend
//! on the previous having run. Applying the whole pipeline to its own output
//! changes nothing.

use std::collections::{HashMap, HashSet};

use crate::ir::{Opcode, Operand, Quad};

/// One rewrite pass over an instruction list.
pub trait Pass {
    /// Run the pass, mutating the list in place.
    fn run(&self, code: &mut Vec<Quad>);

    /// Pass name, for diagnostics.
    fn name(&self) -> &'static str;
}

/// Runs passes in insertion order.
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    pub fn add_pass(&mut self, pass: Box<dyn Pass>) {
        self.passes.push(pass);
    }

    /// The standard five-pass pipeline in its required order.
    pub fn standard() -> Self {
        let mut manager = Self::new();
        manager.add_pass(Box::new(RedundantJumpElimination));
        manager.add_pass(Box::new(AliasPropagation));
        manager.add_pass(Box::new(DeadDefinitionElimination));
        manager.add_pass(Box::new(RenumberTemporaries));
        manager.add_pass(Box::new(PruneUnreferencedLabels));
        manager
    }

    pub fn run(&self, code: &mut Vec<Quad>) {
        for pass in &self.passes {
            pass.run(code);
        }
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the standard pipeline over a quadruple list.
pub fn optimize(code: &mut Vec<Quad>) {
    PassManager::standard().run(code);
}

/// Removes an unconditional jump when control would fall through to its
/// target anyway: every instruction between the jump and the first occurrence
/// of the target label is itself a label. Only the jump goes away; the
/// intervening labels may be targeted by other jumps and stay.
pub struct RedundantJumpElimination;

impl Pass for RedundantJumpElimination {
    fn run(&self, code: &mut Vec<Quad>) {
        let mut result = Vec::with_capacity(code.len());
        let mut index = 0;
        while index < code.len() {
            if code[index].op == Opcode::Jmp {
                if let Operand::Label(target) = &code[index].a {
                    let mut next = index + 1;
                    let mut falls_through = false;
                    while next < code.len() && code[next].op == Opcode::Label {
                        if matches!(&code[next].a, Operand::Label(label) if label == target) {
                            falls_through = true;
                            break;
                        }
                        next += 1;
                    }
                    if falls_through {
                        index += 1;
                        continue;
                    }
                }
            }
            result.push(code[index].clone());
            index += 1;
        }
        *code = result;
    }

    fn name(&self) -> &'static str {
        "redundant-jump-elimination"
    }
}

/// Replaces every use of a qualifying temporary by the thing it was defined
/// from: the bare identifier of a `lod t, id, 0`, or the integer literal of
/// an `ldc t, N, -`. A temporary qualifies when it is defined exactly once in
/// the whole list and never read as a memory base/offset, which makes its
/// value structurally equal to the source at every later read. Definition
/// sites are never rewritten.
pub struct AliasPropagation;

impl Pass for AliasPropagation {
    fn run(&self, code: &mut Vec<Quad>) {
        let mut definitions: HashMap<u32, (usize, usize)> = HashMap::new();
        let mut address_uses: HashSet<u32> = HashSet::new();

        for (index, quad) in code.iter().enumerate() {
            if quad.op.is_pure() {
                if let Operand::Temp(temp) = quad.a {
                    let slot = definitions.entry(temp).or_insert((0, index));
                    slot.0 += 1;
                    slot.1 = index;
                }
            }
            let address_positions: &[usize] = match quad.op {
                Opcode::Lod => &[1, 2],
                Opcode::Str => &[0, 1],
                _ => &[],
            };
            for &position in address_positions {
                if let Some(temp) = quad.operand(position).as_temp() {
                    address_uses.insert(temp);
                }
            }
        }

        let mut aliases: HashMap<u32, Operand> = HashMap::new();
        for (&temp, &(count, index)) in &definitions {
            if count != 1 || address_uses.contains(&temp) {
                continue;
            }
            let quad = &code[index];
            match quad.op {
                Opcode::Lod => {
                    if let (Operand::Name(name), Operand::Lit(offset)) = (&quad.b, &quad.c) {
                        if offset.as_str() == "0" {
                            aliases.insert(temp, Operand::Name(name.clone()));
                        }
                    }
                }
                Opcode::Ldc => {
                    if let Operand::Lit(literal) = &quad.b {
                        if literal.parse::<i64>().is_ok() {
                            aliases.insert(temp, Operand::Lit(literal.clone()));
                        }
                    }
                }
                _ => {}
            }
        }

        for quad in code.iter_mut() {
            for &position in quad.op.use_positions() {
                if let Some(temp) = quad.operand(position).as_temp() {
                    if let Some(replacement) = aliases.get(&temp) {
                        *quad.operand_mut(position) = replacement.clone();
                    }
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "alias-propagation"
    }
}

/// Backward scan tracking the set of temporaries read after the current
/// point. A pure instruction whose destination temporary is not live is
/// dropped; a kept instruction kills its destination and makes its read
/// temporaries live. Sound because temporaries are single-definition and
/// defined before every use in emission order.
pub struct DeadDefinitionElimination;

impl Pass for DeadDefinitionElimination {
    fn run(&self, code: &mut Vec<Quad>) {
        let mut live: HashSet<u32> = HashSet::new();
        let mut kept: Vec<Quad> = Vec::with_capacity(code.len());

        for quad in code.drain(..).rev() {
            if quad.op.is_pure() {
                if let Operand::Temp(temp) = quad.a {
                    if !live.contains(&temp) {
                        continue;
                    }
                    live.remove(&temp);
                }
            }
            for &position in quad.op.use_positions() {
                if let Some(temp) = quad.operand(position).as_temp() {
                    live.insert(temp);
                }
            }
            kept.push(quad);
        }

        kept.reverse();
        *code = kept;
    }

    fn name(&self) -> &'static str {
        "dead-definition-elimination"
    }
}

/// Renames temporaries to `t1, t2, …` in order of first textual appearance,
/// giving the listing a canonical, diff-stable form.
pub struct RenumberTemporaries;

impl Pass for RenumberTemporaries {
    fn run(&self, code: &mut Vec<Quad>) {
        let mut mapping: HashMap<u32, u32> = HashMap::new();
        let mut next = 1;

        for quad in code.iter_mut() {
            for position in 0..3 {
                if let Some(temp) = quad.operand(position).as_temp() {
                    let renamed = match mapping.get(&temp) {
                        Some(renamed) => *renamed,
                        None => {
                            let value = next;
                            mapping.insert(temp, value);
                            next += 1;
                            value
                        }
                    };
                    *quad.operand_mut(position) = Operand::Temp(renamed);
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "renumber-temporaries"
    }
}

/// Drops every label instruction whose name is not the target of any
/// `jmp`, `jnz` or `call`.
pub struct PruneUnreferencedLabels;

impl Pass for PruneUnreferencedLabels {
    fn run(&self, code: &mut Vec<Quad>) {
        let mut referenced: HashSet<String> = HashSet::new();
        for quad in code.iter() {
            if quad.op.is_branch() {
                if let Operand::Label(label) = &quad.a {
                    referenced.insert(label.clone());
                }
            }
        }
        code.retain(|quad| {
            quad.op != Opcode::Label
                || matches!(&quad.a, Operand::Label(label) if referenced.contains(label))
        });
    }

    fn name(&self) -> &'static str {
        "prune-unreferenced-labels"
    }
}
