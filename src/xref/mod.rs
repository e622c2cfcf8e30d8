//! Call-graph scanning over native machine code.
//!
//! Some of the functions class injection needs are not exported by the native runtime. They
//! are found by following calls and jumps out of functions that *are* exported. This module
//! provides the low-level scanner and the ordered heuristics built on top of it.
//!
//! # Jump Targets
//!
//! [`jump_targets`] decodes forward from an address with iced-x86 and yields the destination of
//! every `call` and `jmp` it passes:
//!
//! - near branches yield their branch target
//! - indirect branches (`call rax`, `call [rip+disp]`) yield nothing; the slot of a memory
//!   operand is data, not code
//!
//! Decoding stops at a return, an `int`/`int1`/`int3`, an invalid instruction or the end of the
//! code window, and right after an unconditional `jmp`. Conditional branches are not followed.
//!
//! This is a narrow heuristic, not a disassembler: code is decoded linearly and nothing is
//! validated beyond the instruction stream itself.
//!
//! # Example
//!
//! ```rust
//! use il2scope::xref::jump_targets;
//!
//! // call 0x2000; ret
//! let code = [0xE8, 0xFB, 0x0F, 0x00, 0x00, 0xC3];
//! let targets: Vec<u64> = jump_targets(&code, 64, 0x1000)?.collect();
//! assert_eq!(targets, vec![0x2000]);
//! # Ok::<(), il2scope::Error>(())
//! ```

mod classinit;
mod hook;

pub use classinit::{ClassInitHeuristic, ClassInitLocator, ScanContext};
pub use hook::HookTarget;

use iced_x86::{Decoder, DecoderOptions, FlowControl, Instruction, Mnemonic, OpKind};

use crate::{module::NativeModule, Error, Result};

/// Lazy iterator over the call and jump destinations of a code window.
///
/// Created by [`jump_targets`].
pub struct JumpTargets<'a> {
    decoder: Decoder<'a>,
    done: bool,
}

impl Iterator for JumpTargets<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let mut instr = Instruction::default();

        while !self.done && self.decoder.can_decode() {
            self.decoder.decode_out(&mut instr);

            if instr.is_invalid() || ends_scan(&instr) {
                self.done = true;
                break;
            }

            match instr.mnemonic() {
                Mnemonic::Call => {
                    if let Some(target) = branch_target(&instr) {
                        return Some(target);
                    }
                }
                Mnemonic::Jmp => {
                    self.done = true;
                    return branch_target(&instr);
                }
                _ => {}
            }
        }

        None
    }
}

fn ends_scan(instr: &Instruction) -> bool {
    instr.flow_control() == FlowControl::Return
        || matches!(
            instr.mnemonic(),
            Mnemonic::Int | Mnemonic::Int1 | Mnemonic::Int3
        )
}

fn branch_target(instr: &Instruction) -> Option<u64> {
    let target = match instr.op0_kind() {
        OpKind::NearBranch16 | OpKind::NearBranch32 | OpKind::NearBranch64 => {
            instr.near_branch_target()
        }
        _ => 0,
    };

    (target != 0).then_some(target)
}

/// Scans `code`, located at `ip`, for call and jump destinations.
///
/// # Arguments
/// * `code` - Machine code to decode
/// * `bitness` - 32 for x86, 64 for x64
/// * `ip` - Address of the first byte of `code`
///
/// # Errors
/// Returns [`crate::Error::Decode`] if `bitness` is not supported by the decoder.
pub fn jump_targets(code: &[u8], bitness: u32, ip: u64) -> Result<JumpTargets<'_>> {
    let decoder = Decoder::try_with_ip(bitness, code, ip, DecoderOptions::NONE)
        .map_err(|e| Error::Decode(e.to_string()))?;

    Ok(JumpTargets {
        decoder,
        done: false,
    })
}

/// Collects the jump targets of the function at `address` inside `module`.
///
/// At most `window` bytes are decoded. Modules whose instruction set the scanner cannot decode
/// produce no targets.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `address` is not inside the module.
pub fn module_jump_targets(
    module: &dyn NativeModule,
    address: u64,
    window: usize,
) -> Result<Vec<u64>> {
    let Some(bitness) = module.machine().bitness() else {
        return Ok(Vec::new());
    };

    let code = module.read_code(address, window)?;
    Ok(jump_targets(&code, bitness, address)?.collect())
}

/// The first jump target of the function at `address`, if any.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `address` is not inside the module.
pub fn first_jump_target(
    module: &dyn NativeModule,
    address: u64,
    window: usize,
) -> Result<Option<u64>> {
    let Some(bitness) = module.machine().bitness() else {
        return Ok(None);
    };

    let code = module.read_code(address, window)?;
    let first = jump_targets(&code, bitness, address)?.next();
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{module::Machine, test::FakeModule};

    fn targets(code: &[u8], bitness: u32, ip: u64) -> Vec<u64> {
        jump_targets(code, bitness, ip).unwrap().collect()
    }

    #[test]
    fn test_calls_and_final_jmp() {
        let code = [
            0xE8, 0xFB, 0x0F, 0x00, 0x00, // call 0x2000
            0x48, 0x83, 0xEC, 0x28, // sub rsp, 0x28
            0xE9, 0xF2, 0x2F, 0x00, 0x00, // jmp 0x4000
            0xE8, 0x00, 0x00, 0x00, 0x00, // never reached
        ];
        assert_eq!(targets(&code, 64, 0x1000), vec![0x2000, 0x4000]);
    }

    #[test]
    fn test_memory_operands_skipped() {
        let code = [
            0xFF, 0x15, 0xFA, 0x0F, 0x00, 0x00, // call [rip+0xFFA], slot at 0x2000
            0xE8, 0xF5, 0x1F, 0x00, 0x00, // call 0x3000
            0xC3,
        ];
        assert_eq!(targets(&code, 64, 0x1000), vec![0x3000]);

        // jmp [rip+0xFFA] ends the scan without a target
        let code = [
            0xFF, 0x25, 0xFA, 0x0F, 0x00, 0x00,
            0xE8, 0xF5, 0x1F, 0x00, 0x00,
        ];
        assert!(targets(&code, 64, 0x1000).is_empty());
    }

    #[test]
    fn test_stops_at_ret_and_int3() {
        let code = [0xC3, 0xE8, 0x00, 0x00, 0x00, 0x00];
        assert!(targets(&code, 64, 0x1000).is_empty());

        let code = [0xCC, 0xE8, 0x00, 0x00, 0x00, 0x00];
        assert!(targets(&code, 64, 0x1000).is_empty());

        let code = [0xCD, 0x29, 0xE8, 0x00, 0x00, 0x00, 0x00];
        assert!(targets(&code, 64, 0x1000).is_empty());
    }

    #[test]
    fn test_stops_at_invalid() {
        // push es does not exist in 64-bit mode
        let code = [0x06, 0xE8, 0x00, 0x00, 0x00, 0x00];
        assert!(targets(&code, 64, 0x1000).is_empty());

        // truncated call
        let code = [0x90, 0xE8, 0x00];
        assert!(targets(&code, 64, 0x1000).is_empty());

        assert!(targets(&[], 64, 0x1000).is_empty());
    }

    #[test]
    fn test_register_indirect_and_conditional() {
        let code = [
            0xFF, 0xD0, // call rax
            0x74, 0x02, // je +2
            0xE8, 0xF7, 0x0F, 0x00, 0x00, // call 0x2000
            0xC3,
        ];
        assert_eq!(targets(&code, 64, 0x1000), vec![0x2000]);
    }

    #[test]
    fn test_x86() {
        let code = [0xE8, 0xFB, 0x0F, 0x00, 0x00, 0xC3];
        assert_eq!(targets(&code, 32, 0x40_1000), vec![0x40_2000]);
    }

    #[test]
    fn test_bad_bitness() {
        assert!(matches!(
            jump_targets(&[0x90], 12, 0),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_module_scan() {
        let module = FakeModule::new("GameAssembly.dll").with_code(
            0x1000_1000,
            vec![0xE8, 0xFB, 0x0F, 0x00, 0x00, 0xE9, 0xF6, 0x1F, 0x00, 0x00],
        );

        assert_eq!(
            module_jump_targets(&module, 0x1000_1000, 0x1000).unwrap(),
            vec![0x1000_2000, 0x1000_3000]
        );
        assert_eq!(
            first_jump_target(&module, 0x1000_1000, 0x1000).unwrap(),
            Some(0x1000_2000)
        );
        // window cuts the second instruction off
        assert_eq!(
            module_jump_targets(&module, 0x1000_1000, 7).unwrap(),
            vec![0x1000_2000]
        );
        assert!(first_jump_target(&module, 0x5000, 0x1000).is_err());
    }

    #[test]
    fn test_module_scan_undecodable_machine() {
        let module = FakeModule::new("libil2cpp.so")
            .with_machine(Machine::Other)
            .with_code(0x1000_1000, vec![0xE8, 0xFB, 0x0F, 0x00, 0x00]);

        assert!(module_jump_targets(&module, 0x1000_1000, 0x1000)
            .unwrap()
            .is_empty());
        assert_eq!(first_jump_target(&module, 0x1000_1000, 0x1000).unwrap(), None);
    }
}
