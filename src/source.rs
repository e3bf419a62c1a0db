// Source front end
//
// Turns lines of MIPS assembly into partially encoded instruction words and hands
// them, along with label definitions and label references, to an `Assembler`.
// Supports the subset: addu subu and or xor nor sllv srlv srav, addiu andi ori xori,
// lw sw, beq bne blez bgtz, j jal, nop and .word.

use crate::assembler::Assembler;
use crate::config::AssemblerConfig;
use crate::error::{AssemblyError, Diagnostics};
use crate::instruction::{encode_i, encode_j, encode_r, Function, Opcode, Register};

/// What one source line asks the assembler to emit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Fully encoded word, nothing to patch
    Word(u32),
    /// Jump or branch whose target field waits for `label`
    Reference(u32, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLine {
    pub labels: Vec<String>,
    pub statement: Option<Statement>,
}

fn is_label_name(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn strip_radix<'a>(text: &'a str, lower: &str, upper: &str) -> Option<&'a str> {
    text.strip_prefix(lower).or_else(|| text.strip_prefix(upper))
}

/// Decimal, `0x` hex or `0b` binary, with an optional leading `-`
pub fn parse_int(text: &str) -> Option<i64> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (radix, digits) = if let Some(hex) = strip_radix(body, "0x", "0X") {
        (16, hex)
    } else if let Some(bin) = strip_radix(body, "0b", "0B") {
        (2, bin)
    } else {
        (10, body)
    };
    // from_str_radix would accept its own sign here
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let value = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -value } else { value })
}

fn parse_register(text: &str) -> Result<Register, String> {
    Register::parse(text).ok_or_else(|| format!("Invalid register '{}'", text))
}

/// Sign-extended 16-bit field: `addiu` and load/store offsets
fn parse_signed_immediate(text: &str) -> Result<u16, String> {
    match parse_int(text) {
        Some(value) if (i16::MIN as i64..=i16::MAX as i64).contains(&value) => {
            Ok(value as i16 as u16)
        }
        Some(value) => Err(format!("Immediate {} does not fit in a signed 16-bit field", value)),
        None => Err(format!("Invalid immediate '{}'", text)),
    }
}

/// Zero-extended 16-bit field: `andi`, `ori`, `xori`
fn parse_unsigned_immediate(text: &str) -> Result<u16, String> {
    match parse_int(text) {
        Some(value) if (0..=u16::MAX as i64).contains(&value) => Ok(value as u16),
        Some(value) => Err(format!(
            "Immediate {} does not fit in an unsigned 16-bit field",
            value
        )),
        None => Err(format!("Invalid immediate '{}'", text)),
    }
}

fn parse_label(text: &str) -> Result<String, String> {
    if is_label_name(text) {
        Ok(text.to_string())
    } else {
        Err(format!("Invalid label '{}'", text))
    }
}

/// `offset($base)`, offset may be omitted
fn parse_memory_operand(text: &str) -> Result<(u16, Register), String> {
    let open = text
        .find('(')
        .ok_or_else(|| format!("Expected offset($reg), found '{}'", text))?;
    let inner = text[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| format!("Missing ')' in '{}'", text))?;
    let offset = text[..open].trim();
    let offset = if offset.is_empty() {
        0
    } else {
        parse_signed_immediate(offset)?
    };
    Ok((offset, parse_register(inner.trim())?))
}

fn parse_statement(mnemonic: &str, operands: &[&str]) -> Result<Statement, String> {
    // Fetch operand by index and parse it
    // Example: arg!(0, parse_register) -> Register
    macro_rules! arg {
        ($index:expr, $parse:ident) => {{
            let text = operands
                .get($index)
                .ok_or_else(|| format!("'{}' is missing operand {}", mnemonic, $index + 1))?;
            $parse(text)?
        }};
    }
    macro_rules! expect_operands {
        ($count:expr) => {
            if operands.len() != $count {
                return Err(format!(
                    "'{}' expects {} operands, found {}",
                    mnemonic,
                    $count,
                    operands.len()
                ));
            }
        };
    }

    if mnemonic == "nop" {
        expect_operands!(0);
        return Ok(Statement::Word(0));
    }
    if mnemonic == ".word" {
        expect_operands!(1);
        let text = operands[0];
        return match parse_int(text) {
            Some(value) if (i32::MIN as i64..=u32::MAX as i64).contains(&value) => {
                Ok(Statement::Word(value as u32))
            }
            _ => Err(format!("Invalid word '{}'", text)),
        };
    }

    if let Some(function) = Function::from_mnemonic(mnemonic) {
        expect_operands!(3);
        let rd = arg!(0, parse_register);
        let (rs, rt) = if function.is_variable_shift() {
            let rt = arg!(1, parse_register);
            (arg!(2, parse_register), rt)
        } else {
            (arg!(1, parse_register), arg!(2, parse_register))
        };
        return Ok(Statement::Word(encode_r(function, rd, rs, rt)));
    }

    let opcode = Opcode::from_mnemonic(mnemonic)
        .ok_or_else(|| format!("Unknown operation '{}'", mnemonic))?;
    match opcode {
        Opcode::J | Opcode::Jal => {
            expect_operands!(1);
            Ok(Statement::Reference(encode_j(opcode), arg!(0, parse_label)))
        }
        Opcode::Beq | Opcode::Bne => {
            expect_operands!(3);
            let rs = arg!(0, parse_register);
            let rt = arg!(1, parse_register);
            let word = encode_i(opcode, rs, rt, 0);
            Ok(Statement::Reference(word, arg!(2, parse_label)))
        }
        Opcode::Blez | Opcode::Bgtz => {
            expect_operands!(2);
            let rs = arg!(0, parse_register);
            let word = encode_i(opcode, rs, Register::ZERO, 0);
            Ok(Statement::Reference(word, arg!(1, parse_label)))
        }
        Opcode::Lw | Opcode::Sw => {
            expect_operands!(2);
            let rt = arg!(0, parse_register);
            let (offset, rs) = arg!(1, parse_memory_operand);
            Ok(Statement::Word(encode_i(opcode, rs, rt, offset)))
        }
        Opcode::Addiu => {
            expect_operands!(3);
            let rt = arg!(0, parse_register);
            let rs = arg!(1, parse_register);
            let immediate = arg!(2, parse_signed_immediate);
            Ok(Statement::Word(encode_i(opcode, rs, rt, immediate)))
        }
        Opcode::Andi | Opcode::Ori | Opcode::Xori => {
            expect_operands!(3);
            let rt = arg!(0, parse_register);
            let rs = arg!(1, parse_register);
            let immediate = arg!(2, parse_unsigned_immediate);
            Ok(Statement::Word(encode_i(opcode, rs, rt, immediate)))
        }
        Opcode::Special => Err(format!("Unknown operation '{}'", mnemonic)),
    }
}

impl SourceLine {
    pub fn parse(raw: &str) -> Result<SourceLine, String> {
        let code = match raw.find(|c: char| c == '#' || c == ';') {
            Some(index) => &raw[..index],
            None => raw,
        };
        let mut rest = code.trim();
        let mut line = SourceLine::default();

        // Leading `name:` labels
        while let Some(colon) = rest.find(':') {
            let candidate = rest[..colon].trim();
            if !is_label_name(candidate) {
                break;
            }
            line.labels.push(candidate.to_string());
            rest = rest[colon + 1..].trim_start();
        }

        if rest.is_empty() {
            return Ok(line);
        }

        let (mnemonic, operand_text) = match rest.find(char::is_whitespace) {
            Some(index) => (&rest[..index], rest[index..].trim()),
            None => (rest, ""),
        };
        let operands: Vec<&str> = if operand_text.is_empty() {
            Vec::new()
        } else {
            operand_text.split(',').map(str::trim).collect()
        };

        line.statement = Some(parse_statement(&mnemonic.to_ascii_lowercase(), &operands)?);
        Ok(line)
    }
}

/// Assemble `source` end to end: collect definitions and references line by line,
/// then patch. Parse errors and patch diagnostics are collected, not short-circuited.
pub fn assemble_source(source: &str, config: AssemblerConfig) -> Result<Assembler, AssemblyError> {
    config.validate()?;
    let mut assembler = Assembler::new(config);
    let mut parse_errors = Vec::new();
    let mut diagnostics = Diagnostics::new();

    for (index, raw) in source.lines().enumerate() {
        let line_number = index + 1;
        let line = match SourceLine::parse(raw) {
            Ok(line) => line,
            Err(msg) => {
                log::debug!("line {}: {}", line_number, msg);
                parse_errors.push((line_number, msg));
                continue;
            }
        };

        for label in &line.labels {
            if let Err(e) = assembler.define_label_here(label) {
                diagnostics.push(e);
            }
        }

        let result = match line.statement {
            Some(Statement::Word(word)) => assembler.append_instruction(word).map(|_| ()),
            Some(Statement::Reference(word, label)) => {
                assembler.append_reference(word, &label).map(|_| ())
            }
            None => Ok(()),
        };
        if let Err(e) = result {
            diagnostics.push(e);
        }
    }

    if !parse_errors.is_empty() {
        return Err(AssemblyError::Parse(parse_errors));
    }

    log::info!(
        "Collected {} instructions and {} labels",
        assembler.stream().len(),
        assembler.symbols().len()
    );

    if let Err(patch_diagnostics) = assembler.patch_all() {
        for e in patch_diagnostics {
            diagnostics.push(e);
        }
    }
    if !diagnostics.is_empty() {
        return Err(AssemblyError::Patch(diagnostics));
    }
    Ok(assembler)
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
