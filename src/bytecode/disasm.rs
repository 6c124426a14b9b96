use std::collections::BTreeSet;
use std::fmt::Write;

use crate::bytecode::Op;
use crate::bytecode::artifact::Artifact;

/// Print disassembly of a bytecode artifact
pub fn print_bc(artifact: &Artifact) {
    print!("{}", disassemble_to_string(artifact));
}

/// Return disassembly as a String
///
/// Header and constant pools first, then one line per instruction. Jump
/// targets are marked; undecodable bytes are shown raw and skipped.
pub fn disassemble_to_string(artifact: &Artifact) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== BYTECODE ARTIFACT ===");
    let _ = writeln!(out, "code bytes:    {}", artifact.code.len());
    let _ = writeln!(out, "int slots:     {}", artifact.int_slots);
    let _ = writeln!(out, "str slots:     {}", artifact.str_slots);
    for (i, value) in artifact.int_pool.iter().enumerate() {
        let _ = writeln!(out, "int const {:>3}: {}", i, value);
    }
    for (i, value) in artifact.str_pool.iter().enumerate() {
        let _ = writeln!(out, "str const {:>3}: {:?}", i, value);
    }
    let _ = writeln!(out);

    let jump_targets = collect_jump_targets(&artifact.code);
    let mut ip = 0;
    while ip < artifact.code.len() {
        if jump_targets.contains(&ip) {
            out.push_str("      ┌──────────────────────────────────\n");
        }
        let marker = if jump_targets.contains(&ip) { "► " } else { "  " };
        let _ = write!(out, "{:04} {}", ip, marker);
        ip += format_instruction(&mut out, artifact, ip);
        out.push('\n');
    }

    out
}

/// Writes the instruction at `ip` and returns how many bytes it took.
fn format_instruction(out: &mut String, artifact: &Artifact, ip: usize) -> usize {
    let byte = artifact.code[ip];
    let Some(op) = Op::from_byte(byte) else {
        let _ = write!(out, ".byte       {}  ; unknown opcode", byte);
        return 1;
    };
    if !op.has_arg() {
        let _ = write!(out, "{}", op);
        return 1;
    }
    let Some(arg) = read_arg(&artifact.code, ip) else {
        let _ = write!(out, "{:<14} ; missing operand", op.mnemonic());
        return artifact.code.len() - ip;
    };

    let _ = write!(out, "{:<14} {:<5}", op.mnemonic(), arg);
    let index = arg as usize;
    match op {
        Op::LoadConstInt => {
            if let Some(value) = artifact.int_pool.get(index) {
                let _ = write!(out, " ; {}", value);
            }
        }
        Op::LoadConstStr => {
            if let Some(value) = artifact.str_pool.get(index) {
                let _ = write!(out, " ; {:?}", value);
            }
        }
        Op::Jmp | Op::Jmpz => {
            let direction = if index <= ip { "↑" } else { "↓" };
            let _ = write!(out, " ; {} (→ {:04})", direction, index);
        }
        _ => {}
    }
    op.width()
}

fn read_arg(code: &[u8], ip: usize) -> Option<u16> {
    match code.get(ip + 1..ip + 3) {
        Some(&[lo, hi]) => Some(u16::from_le_bytes([lo, hi])),
        _ => None,
    }
}

fn collect_jump_targets(code: &[u8]) -> BTreeSet<usize> {
    let mut targets = BTreeSet::new();
    let mut ip = 0;
    while ip < code.len() {
        let Some(op) = Op::from_byte(code[ip]) else {
            ip += 1;
            continue;
        };
        if op.is_jump() {
            if let Some(target) = read_arg(code, ip) {
                targets.insert(target as usize);
            }
        }
        ip += op.width();
    }
    targets
}
