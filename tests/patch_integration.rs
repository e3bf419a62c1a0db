//! End-to-end tests for label resolution
//!
//! These drive the public API the way a front end would: record instructions,
//! label definitions and references in any order, patch once, then read the
//! final words.

use mipspatch::{
    assemble_source, Assembler, AssemblerConfig, AssemblyError, PatchError, ReferenceKind,
};

const J: u32 = 0x0800_0000;
const JAL: u32 = 0x0C00_0000;
const BEQ: u32 = 0x1000_0000;

/// Counting loop with a subroutine call, base address 0x00400000
const PROGRAM: &str = "
main:
        addiu $t0, $zero, 3
loop:   beq   $t0, $zero, exit
        nop
        jal   body
        nop
        addiu $t0, $t0, -1
        j     loop
        nop
exit:   j     exit
        nop
body:   addu  $v0, $v0, $t0
        .word 0
";

#[test]
fn test_program_assembles_with_expected_words() {
    let config = AssemblerConfig {
        base_address: 0x0040_0000,
        ..AssemblerConfig::default()
    };
    let assembler = assemble_source(PROGRAM, config).unwrap();
    let words = assembler.final_instruction_words().unwrap();
    assert_eq!(words.len(), 12);

    // beq at 0x400004 -> exit at 0x400020: (0x20 - 0x04 - 4) >> 2 = 6
    assert_eq!(words[1], 0x1100_0006);
    // jal body (0x400028)
    assert_eq!(words[3], JAL | (0x0040_0028 >> 2));
    // j loop (0x400004)
    assert_eq!(words[6], J | (0x0040_0004 >> 2));
    // j exit jumps to itself
    assert_eq!(words[8], J | (0x0040_0020 >> 2));

    assert!(assembler.symbols().undefined_labels().is_empty());
    assert_eq!(assembler.symbols().pending_reference_count(), 0);
}

#[test]
fn test_manual_api_matches_source_front_end() {
    let mut asm = Assembler::new(AssemblerConfig::default());
    let branch = asm.append_instruction(BEQ).unwrap();
    asm.reference_label(branch, 0, "skip").unwrap();
    asm.append_instruction(0).unwrap();
    asm.append_instruction(0).unwrap();
    asm.define_label_here("skip").unwrap();
    asm.append_reference(J, "skip").unwrap();
    let report = asm.patch_all().unwrap();

    let source = "beq $zero, $zero, skip\nnop\nnop\nskip: j skip\n";
    let from_source = assemble_source(source, AssemblerConfig::default()).unwrap();

    assert_eq!(report.branches, 1);
    assert_eq!(report.jumps, 1);
    assert_eq!(
        asm.final_instruction_words().unwrap(),
        from_source.final_instruction_words().unwrap()
    );
}

#[test]
fn test_reference_kind_is_fixed_when_recorded() {
    let mut asm = Assembler::new(AssemblerConfig::default());
    asm.append_reference(BEQ, "x").unwrap();
    asm.append_reference(JAL, "x").unwrap();

    let kinds: Vec<ReferenceKind> = asm
        .symbols()
        .get("x")
        .unwrap()
        .references
        .iter()
        .map(|r| r.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![ReferenceKind::RelativeBranch, ReferenceKind::AbsoluteJump]
    );
}

#[test]
fn test_failure_reports_every_problem() {
    let source = "
        start: beq $t0, $t1, gone
               j   missing
        start: nop
    ";
    let err = assemble_source(source, AssemblerConfig::default()).unwrap_err();
    let diagnostics = match err {
        AssemblyError::Patch(diagnostics) => diagnostics,
        other => panic!("expected patch diagnostics, got {}", other),
    };
    assert_eq!(diagnostics.len(), 3);
    assert!(diagnostics.contains(&PatchError::DuplicateLabel("start".to_string())));
    assert!(diagnostics.contains(&PatchError::UndefinedLabel("gone".to_string())));
    assert!(diagnostics.contains(&PatchError::UndefinedLabel("missing".to_string())));

    let text = diagnostics.to_string();
    assert_eq!(text.lines().count(), 3);
    assert!(text.lines().all(|line| line.starts_with("error: ")));
}

#[test]
fn test_config_file_drives_assembly() {
    let config = AssemblerConfig::from_toml_str(
        "base_address = 0x1000\nendian = \"big\"\ncheck_displacement_overflow = true\n",
    )
    .unwrap();
    let assembler = assemble_source("top: j top\n", config).unwrap();
    assert_eq!(assembler.final_bytes().unwrap(), vec![0x08, 0x00, 0x04, 0x00]);
}
