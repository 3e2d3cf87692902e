//! 已编译单元（Core 层）
//!
//! `Unit` 是解释器的输入：指令流、常量池、单元内标识符表、行号信息
//! 以及参数/局部槽位元数据。不依赖运行时实现。

use serde::{Deserialize, Serialize};

use super::bytecode::OpCode;

/// 常量池条目
///
/// 与 `Value` 分离：常量池只存普通数据，单元才能序列化；
/// 字符串常量在 `LOAD_CONST` 时物化到 GC 堆。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    None,
    True,
    False,
    Int(i64),
    Str(String),
}

/// 已编译单元
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Unit {
    /// 单元名（用于回溯信息）
    pub name: String,
    /// 参数个数（填充快速局部槽位前缀）
    pub n_args: u8,
    /// 局部变量槽位总数（含参数）
    pub n_locals: u16,
    /// 指令字节码
    pub code: Vec<u8>,
    /// 常量池
    pub constants: Vec<Constant>,
    /// 单元内标识符表（执行时驻留为 TokenId）
    pub tokens: Vec<String>,
    /// 行号信息（与 code 逐字节平行）
    pub lines: Vec<usize>,
}

impl Unit {
    /// 创建空单元
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            n_args: 0,
            n_locals: 0,
            code: Vec::new(),
            constants: Vec::new(),
            tokens: Vec::new(),
            lines: Vec::new(),
        }
    }

    // ==================== 写入 API ====================

    /// 写入单字节指令
    pub fn write_op(&mut self, op: OpCode, line: usize) {
        self.code.push(op as u8);
        self.lines.push(line);
    }

    /// 写入带 u8 操作数的指令
    pub fn write_op_u8(&mut self, op: OpCode, operand: u8, line: usize) {
        self.code.push(op as u8);
        self.code.push(operand);
        self.lines.push(line);
        self.lines.push(line);
    }

    /// 写入带 i8 操作数的指令
    pub fn write_op_i8(&mut self, op: OpCode, operand: i8, line: usize) {
        self.write_op_u8(op, operand as u8, line);
    }

    /// 写入 i16 操作数
    pub fn write_i16(&mut self, value: i16, line: usize) {
        let bytes = value.to_le_bytes();
        self.code.push(bytes[0]);
        self.code.push(bytes[1]);
        self.lines.push(line);
        self.lines.push(line);
    }

    /// 写入 u16 操作数
    pub fn write_u16(&mut self, value: u16, line: usize) {
        let bytes = value.to_le_bytes();
        self.code.push(bytes[0]);
        self.code.push(bytes[1]);
        self.lines.push(line);
        self.lines.push(line);
    }

    /// 写入跳转类指令（占位），返回待修补的操作数偏移
    ///
    /// 适用于 Jump / JumpIfFalse / SetupExcept / SetupFinally。
    pub fn write_jump(&mut self, op: OpCode, line: usize) -> usize {
        self.write_op(op, line);
        let offset = self.code.len();
        self.write_i16(-1i16, line);
        offset
    }

    /// 修补跳转偏移量，使其指向当前写入位置
    pub fn patch_jump(&mut self, offset: usize) {
        let jump = self.code.len() - (offset + 2);
        let jump_i16 = jump as i16;
        let bytes = jump_i16.to_le_bytes();
        self.code[offset] = bytes[0];
        self.code[offset + 1] = bytes[1];
    }

    /// 添加常量，返回池内下标
    pub fn add_constant(&mut self, constant: Constant) -> u16 {
        self.constants.push(constant);
        (self.constants.len() - 1) as u16
    }

    /// 指令偏移对应的行号；0 表示行号信息已剥离
    pub fn line_at(&self, offset: usize) -> Option<usize> {
        self.lines.get(offset).copied().filter(|&line| line > 0)
    }

    /// 添加标识符（去重），返回单元内下标
    pub fn add_token(&mut self, name: &str) -> u8 {
        if let Some(idx) = self.tokens.iter().position(|t| t == name) {
            return idx as u8;
        }
        self.tokens.push(name.to_string());
        (self.tokens.len() - 1) as u8
    }

    // ==================== 诊断输出 ====================

    /// 序列化为 JSON（dump_bytecode 模式）
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// 反汇编整个单元
    pub fn disassemble(&self, name: &str) {
        println!("== {} ==", name);
        println!("args: {}  locals: {}", self.n_args, self.n_locals);
        println!("Constants:");
        for (i, constant) in self.constants.iter().enumerate() {
            println!("  [{:3}] {:?}", i, constant);
        }
        if !self.tokens.is_empty() {
            println!("Tokens:");
            for (i, token) in self.tokens.iter().enumerate() {
                println!("  [{:3}] {}", i, token);
            }
        }
        println!("\nBytecode:");

        let mut offset = 0;
        while offset < self.code.len() {
            offset = self.disassemble_instruction(offset);
        }
    }

    /// 反汇编单条指令，返回下一条指令的偏移
    pub(crate) fn disassemble_instruction(&self, offset: usize) -> usize {
        print!("{:04} ", offset);

        // 打印行号
        if offset > 0 && self.lines[offset] == self.lines[offset - 1] {
            print!("   | ");
        } else {
            print!("{:4} ", self.lines[offset]);
        }

        let instruction = self.code[offset];
        let Some(opcode) = OpCode::from_u8(instruction) else {
            println!("Unknown opcode 0x{:02X}", instruction);
            return offset + 1;
        };

        match opcode {
            // 无操作数指令
            op if op.operand_size() == 0 => {
                println!("{}", op.name());
                offset + 1
            }

            // 常量类 u8 操作数
            OpCode::LoadConst => {
                let idx = self.code[offset + 1];
                println!(
                    "{} {:3} {:?}",
                    opcode.name(),
                    idx,
                    self.constants[idx as usize]
                );
                offset + 2
            }

            OpCode::LoadToken => {
                let idx = self.code[offset + 1];
                println!("{} {:3} {}", opcode.name(), idx, self.tokens[idx as usize]);
                offset + 2
            }

            OpCode::LoadSmallInt => {
                let imm = self.code[offset + 1] as i8;
                println!("{} {}", opcode.name(), imm);
                offset + 2
            }

            OpCode::LoadLocal
            | OpCode::StoreLocal
            | OpCode::LoadGlobal
            | OpCode::StoreGlobal
            | OpCode::Call
            | OpCode::BuildList => {
                let operand = self.code[offset + 1];
                println!("{} {}", opcode.name(), operand);
                offset + 2
            }

            // i16 操作数（跳转与保护区域）
            OpCode::Jump
            | OpCode::JumpIfFalse
            | OpCode::JumpBack
            | OpCode::SetupExcept
            | OpCode::SetupFinally => {
                let jump = i16::from_le_bytes([self.code[offset + 1], self.code[offset + 2]]);
                let target = if jump >= 0 {
                    offset + 3 + jump as usize
                } else {
                    offset + 3 - (-jump) as usize
                };
                println!("{} {} (to {})", opcode.name(), jump, target);
                offset + 3
            }

            OpCode::LoadConstWide => {
                let idx = u16::from_le_bytes([self.code[offset + 1], self.code[offset + 2]]);
                println!(
                    "{} {:3} {:?}",
                    opcode.name(),
                    idx,
                    self.constants[idx as usize]
                );
                offset + 3
            }

            _ => {
                println!("{}", opcode.name());
                offset + 1
            }
        }
    }
}
