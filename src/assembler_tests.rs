use crate::assembler::{Assembler, Phase};
use crate::config::AssemblerConfig;
use crate::error::PatchError;
use crate::stream::Endian;

use test_log::test;

const J: u32 = 0x0800_0000;
const BNE: u32 = 0x1400_0000;

#[test]
fn test_reference_then_define() {
    let mut asm = Assembler::default();
    let jump = asm.append_instruction(J).unwrap();
    asm.reference_label(jump, 0, "end").unwrap();
    asm.append_instruction(0).unwrap();
    asm.define_label_here("end").unwrap();
    asm.append_instruction(0).unwrap();

    asm.patch_all().unwrap();
    assert_eq!(asm.phase(), Phase::Patched);
    assert_eq!(asm.final_instruction_words().unwrap(), &[J | 0x2, 0, 0]);
}

#[test]
fn test_reference_rejects_plain_instruction() {
    let mut asm = Assembler::default();
    let handle = asm.append_instruction(0x2408_0001).unwrap();
    assert_eq!(
        asm.reference_label(handle, 0, "x"),
        Err(PatchError::NotJumpOrBranch(0, 0x2408_0001))
    );
    assert!(asm.symbols().is_empty());
}

#[test]
fn test_base_address_applies_to_labels() {
    let config = AssemblerConfig {
        base_address: 0x0040_0000,
        ..AssemblerConfig::default()
    };
    let mut asm = Assembler::new(config);
    asm.define_label_here("start").unwrap();
    asm.append_instruction(0).unwrap();
    assert_eq!(asm.current_address().unwrap(), 0x0040_0004);
    asm.append_reference(J, "start").unwrap();

    asm.patch_all().unwrap();
    // 0x00400000 >> 2
    assert_eq!(asm.final_instruction_words().unwrap()[1], J | 0x0010_0000);
}

#[test]
fn test_words_unavailable_before_patch() {
    let mut asm = Assembler::default();
    asm.append_instruction(0).unwrap();
    assert_eq!(asm.final_instruction_words(), Err(PatchError::NotPatched));
    assert_eq!(asm.final_bytes(), Err(PatchError::NotPatched));
}

#[test]
fn test_patch_runs_once() {
    let mut asm = Assembler::default();
    asm.append_reference(J, "top").unwrap();
    asm.define_label("top", 0).unwrap();
    asm.patch_all().unwrap();

    let err = asm.patch_all().unwrap_err();
    assert_eq!(err.into_vec(), vec![PatchError::AlreadyPatched]);
    // Still the single patch
    assert_eq!(asm.final_instruction_words().unwrap(), &[J]);
}

#[test]
fn test_no_recording_after_patch() {
    let mut asm = Assembler::default();
    asm.patch_all().unwrap();

    assert!(matches!(
        asm.append_instruction(0),
        Err(PatchError::PhaseViolation(_))
    ));
    assert!(matches!(
        asm.define_label("late", 0),
        Err(PatchError::PhaseViolation(_))
    ));
    assert!(matches!(
        asm.append_reference(J, "late"),
        Err(PatchError::PhaseViolation(_))
    ));
}

#[test]
fn test_failed_patch_is_final() {
    let mut asm = Assembler::default();
    asm.append_reference(BNE, "missing").unwrap();

    let err = asm.patch_all().unwrap_err();
    assert!(err.contains(&PatchError::UndefinedLabel("missing".to_string())));
    assert_eq!(asm.phase(), Phase::Failed);
    assert_eq!(asm.final_instruction_words(), Err(PatchError::NotPatched));
    assert!(matches!(
        asm.define_label("missing", 0),
        Err(PatchError::PhaseViolation(_))
    ));
    assert_eq!(asm.stream().words(), &[BNE]);
}

#[test]
fn test_range_checks_follow_config() {
    let build = |check: bool| {
        let config = AssemblerConfig {
            check_displacement_overflow: check,
            ..AssemblerConfig::default()
        };
        let mut asm = Assembler::new(config);
        asm.append_reference(BNE, "far").unwrap();
        asm.define_label("far", 0x4_0000).unwrap();
        asm.patch_all().map(|_| asm.stream().words()[0])
    };

    assert!(build(true).is_err());
    // (0x40000 - 4) >> 2 = 0xFFFF, fits the field but not the signed range
    assert_eq!(build(false), Ok(BNE | 0xFFFF));
}

#[test]
fn test_final_bytes_use_config_endian() {
    let config = AssemblerConfig {
        endian: Endian::Big,
        ..AssemblerConfig::default()
    };
    let mut asm = Assembler::new(config);
    asm.append_instruction(0x1234_5678).unwrap();
    asm.patch_all().unwrap();
    assert_eq!(asm.final_bytes().unwrap(), vec![0x12, 0x34, 0x56, 0x78]);
}

#[test]
fn test_listing_shows_labels_and_disassembly() {
    let mut asm = Assembler::default();
    asm.define_label_here("top").unwrap();
    asm.append_reference(J, "top").unwrap();
    asm.append_instruction(0).unwrap();
    asm.patch_all().unwrap();

    let listing = asm.listing();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0], "0x00000000  08000000  top:         j 0x0000000");
    assert_eq!(listing[1], "0x00000004  00000000               nop");
}

#[test]
fn test_reference_address_must_match_instruction() {
    let mut asm = Assembler::default();
    for _ in 0..4 {
        asm.append_instruction(0).unwrap();
    }
    let branch = asm.append_instruction(0x1000_0000).unwrap();

    assert_eq!(
        asm.reference_label(branch, 0x0, "t"),
        Err(PatchError::AddressMismatch(0x0, 0x10))
    );
    asm.reference_label(branch, 0x10, "t").unwrap();
    asm.define_label("t", 0x40).unwrap();
    asm.patch_all().unwrap();

    // (0x40 - 0x10 - 4) >> 2
    assert_eq!(asm.final_instruction_words().unwrap()[4], 0x1000_000B);
}

#[test]
fn test_stream_end_of_address_space() {
    let config = AssemblerConfig {
        base_address: 0xFFFF_FFF8,
        ..AssemblerConfig::default()
    };
    let mut asm = Assembler::new(config);
    asm.append_instruction(0).unwrap();
    asm.append_instruction(0).unwrap();

    let overflow = PatchError::AddressOverflow(0xFFFF_FFF8, 3);
    assert_eq!(asm.current_address(), Err(overflow.clone()));
    assert_eq!(asm.define_label_here("wrapped"), Err(overflow.clone()));
    assert_eq!(asm.append_instruction(0), Err(overflow.clone()));
    assert_eq!(asm.append_reference(J, "wrapped"), Err(overflow));
    assert!(asm.symbols().is_empty());
    assert_eq!(asm.stream().len(), 2);
}
