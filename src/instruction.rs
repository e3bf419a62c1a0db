use std::fmt::{self, Display, Formatter};

/// Primary 6-bit opcode field (bits 31..26)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// R-type; the operation is selected by the function field
    Special,
    J,
    Jal,
    Beq,
    Bne,
    Blez,
    Bgtz,
    Addiu,
    Andi,
    Ori,
    Xori,
    Lw,
    Sw,
}

impl Opcode {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits & 0x3F {
            0x00 => Some(Opcode::Special),
            0x02 => Some(Opcode::J),
            0x03 => Some(Opcode::Jal),
            0x04 => Some(Opcode::Beq),
            0x05 => Some(Opcode::Bne),
            0x06 => Some(Opcode::Blez),
            0x07 => Some(Opcode::Bgtz),
            0x09 => Some(Opcode::Addiu),
            0x0C => Some(Opcode::Andi),
            0x0D => Some(Opcode::Ori),
            0x0E => Some(Opcode::Xori),
            0x23 => Some(Opcode::Lw),
            0x2B => Some(Opcode::Sw),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Opcode::Special => 0x00,
            Opcode::J => 0x02,
            Opcode::Jal => 0x03,
            Opcode::Beq => 0x04,
            Opcode::Bne => 0x05,
            Opcode::Blez => 0x06,
            Opcode::Bgtz => 0x07,
            Opcode::Addiu => 0x09,
            Opcode::Andi => 0x0C,
            Opcode::Ori => 0x0D,
            Opcode::Xori => 0x0E,
            Opcode::Lw => 0x23,
            Opcode::Sw => 0x2B,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Special => "special",
            Opcode::J => "j",
            Opcode::Jal => "jal",
            Opcode::Beq => "beq",
            Opcode::Bne => "bne",
            Opcode::Blez => "blez",
            Opcode::Bgtz => "bgtz",
            Opcode::Addiu => "addiu",
            Opcode::Andi => "andi",
            Opcode::Ori => "ori",
            Opcode::Xori => "xori",
            Opcode::Lw => "lw",
            Opcode::Sw => "sw",
        }
    }

    pub fn from_mnemonic(name: &str) -> Option<Self> {
        match name {
            "j" => Some(Opcode::J),
            "jal" => Some(Opcode::Jal),
            "beq" => Some(Opcode::Beq),
            "bne" => Some(Opcode::Bne),
            "blez" => Some(Opcode::Blez),
            "bgtz" => Some(Opcode::Bgtz),
            "addiu" => Some(Opcode::Addiu),
            "andi" => Some(Opcode::Andi),
            "ori" => Some(Opcode::Ori),
            "xori" => Some(Opcode::Xori),
            "lw" => Some(Opcode::Lw),
            "sw" => Some(Opcode::Sw),
            _ => None,
        }
    }

    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::J | Opcode::Jal)
    }

    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Opcode::Beq | Opcode::Bne | Opcode::Blez | Opcode::Bgtz
        )
    }
}

/// R-type function field (bits 5..0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Sllv,
    Srlv,
    Srav,
    Addu,
    Subu,
    And,
    Or,
    Xor,
    Nor,
}

impl Function {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits & 0x3F {
            0x04 => Some(Function::Sllv),
            0x06 => Some(Function::Srlv),
            0x07 => Some(Function::Srav),
            0x21 => Some(Function::Addu),
            0x23 => Some(Function::Subu),
            0x24 => Some(Function::And),
            0x25 => Some(Function::Or),
            0x26 => Some(Function::Xor),
            0x27 => Some(Function::Nor),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Function::Sllv => 0x04,
            Function::Srlv => 0x06,
            Function::Srav => 0x07,
            Function::Addu => 0x21,
            Function::Subu => 0x23,
            Function::And => 0x24,
            Function::Or => 0x25,
            Function::Xor => 0x26,
            Function::Nor => 0x27,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Function::Sllv => "sllv",
            Function::Srlv => "srlv",
            Function::Srav => "srav",
            Function::Addu => "addu",
            Function::Subu => "subu",
            Function::And => "and",
            Function::Or => "or",
            Function::Xor => "xor",
            Function::Nor => "nor",
        }
    }

    pub fn from_mnemonic(name: &str) -> Option<Self> {
        match name {
            "sllv" => Some(Function::Sllv),
            "srlv" => Some(Function::Srlv),
            "srav" => Some(Function::Srav),
            "addu" => Some(Function::Addu),
            "subu" => Some(Function::Subu),
            "and" => Some(Function::And),
            "or" => Some(Function::Or),
            "xor" => Some(Function::Xor),
            "nor" => Some(Function::Nor),
            _ => None,
        }
    }

    /// Variable shifts take their operands as `rd, rt, rs`
    pub fn is_variable_shift(self) -> bool {
        matches!(self, Function::Sllv | Function::Srlv | Function::Srav)
    }
}

const REGISTER_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5", "t6",
    "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1", "gp", "sp",
    "s8", "ra",
];

/// General purpose register number (0..=31)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register(u8);

impl Register {
    pub const ZERO: Register = Register(0);
    pub const RA: Register = Register(31);

    pub fn new(number: u8) -> Option<Self> {
        if number < 32 {
            Some(Register(number))
        } else {
            None
        }
    }

    pub fn number(self) -> u32 {
        self.0 as u32
    }

    pub fn name(self) -> &'static str {
        REGISTER_NAMES[self.0 as usize]
    }

    /// Parse `$t0`, `$8` or `$fp` (alias for `$s8`)
    pub fn parse(text: &str) -> Option<Self> {
        let body = text.strip_prefix('$')?;
        if let Ok(number) = body.parse::<u8>() {
            return Register::new(number);
        }
        if body == "fp" {
            return Some(Register(30));
        }
        REGISTER_NAMES
            .iter()
            .position(|&name| name == body)
            .map(|index| Register(index as u8))
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "${}", self.name())
    }
}

/// Broad instruction classes, as shown in listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    Register,
    Immediate,
    Memory,
    Jump,
    Branch,
}

pub fn encode_r(function: Function, rd: Register, rs: Register, rt: Register) -> u32 {
    (rs.number() << 21) | (rt.number() << 16) | (rd.number() << 11) | function.bits()
}

pub fn encode_i(opcode: Opcode, rs: Register, rt: Register, immediate: u16) -> u32 {
    (opcode.bits() << 26) | (rs.number() << 21) | (rt.number() << 16) | immediate as u32
}

/// Jump with the 26-bit target left at zero, to be filled by the patcher
pub fn encode_j(opcode: Opcode) -> u32 {
    opcode.bits() << 26
}

/// A view over a raw 32-bit instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction(u32);

impl Instruction {
    pub fn new(word: u32) -> Self {
        Instruction(word)
    }

    pub fn word(&self) -> u32 {
        self.0
    }

    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_bits(self.0 >> 26)
    }

    pub fn function(&self) -> Option<Function> {
        Function::from_bits(self.0)
    }

    pub fn rs(&self) -> Register {
        Register(((self.0 >> 21) & 0x1F) as u8)
    }

    pub fn rt(&self) -> Register {
        Register(((self.0 >> 16) & 0x1F) as u8)
    }

    pub fn rd(&self) -> Register {
        Register(((self.0 >> 11) & 0x1F) as u8)
    }

    pub fn immediate(&self) -> i16 {
        (self.0 & 0xFFFF) as u16 as i16
    }

    /// Byte address within the current 256 MiB region
    pub fn target(&self) -> u32 {
        (self.0 & 0x03FF_FFFF) << 2
    }

    pub fn kind(&self) -> Option<InstructionKind> {
        let kind = match self.opcode()? {
            Opcode::Special => InstructionKind::Register,
            Opcode::J | Opcode::Jal => InstructionKind::Jump,
            Opcode::Beq | Opcode::Bne | Opcode::Blez | Opcode::Bgtz => InstructionKind::Branch,
            Opcode::Lw | Opcode::Sw => InstructionKind::Memory,
            Opcode::Addiu | Opcode::Andi | Opcode::Ori | Opcode::Xori => {
                InstructionKind::Immediate
            }
        };
        Some(kind)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "nop");
        }
        let opcode = match self.opcode() {
            Some(opcode) => opcode,
            None => return write!(f, ".word 0x{:08x}", self.0),
        };
        match opcode {
            Opcode::Special => match self.function() {
                Some(function) if function.is_variable_shift() => write!(
                    f,
                    "{} {}, {}, {}",
                    function.mnemonic(),
                    self.rd(),
                    self.rt(),
                    self.rs()
                ),
                Some(function) => write!(
                    f,
                    "{} {}, {}, {}",
                    function.mnemonic(),
                    self.rd(),
                    self.rs(),
                    self.rt()
                ),
                None => write!(f, ".word 0x{:08x}", self.0),
            },
            Opcode::J | Opcode::Jal => {
                write!(f, "{} 0x{:07x}", opcode.mnemonic(), self.target())
            }
            Opcode::Beq | Opcode::Bne => write!(
                f,
                "{} {}, {}, {}",
                opcode.mnemonic(),
                self.rs(),
                self.rt(),
                self.immediate()
            ),
            Opcode::Blez | Opcode::Bgtz => {
                write!(f, "{} {}, {}", opcode.mnemonic(), self.rs(), self.immediate())
            }
            Opcode::Lw | Opcode::Sw => write!(
                f,
                "{} {}, {}({})",
                opcode.mnemonic(),
                self.rt(),
                self.immediate(),
                self.rs()
            ),
            Opcode::Addiu | Opcode::Andi | Opcode::Ori | Opcode::Xori => write!(
                f,
                "{} {}, {}, {}",
                opcode.mnemonic(),
                self.rt(),
                self.rs(),
                self.immediate()
            ),
        }
    }
}

#[cfg(test)]
#[path = "instruction_tests.rs"]
mod tests;
