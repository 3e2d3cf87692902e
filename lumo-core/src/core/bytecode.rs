//! 字节码指令集（Core 层）
//!
//! 操作数统一小端编码；跳转类偏移为 i16，相对操作数之后的下一条指令。

/// 操作码定义
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    // ===== 常量加载 (0x00-0x1F) =====
    LoadConst0 = 0x00,
    LoadConst1,
    LoadConst2,
    LoadConst3,
    LoadConst = 0x08,     // + u8 索引
    LoadConstWide = 0x09, // + u16 索引

    LoadNone = 0x10,
    LoadTrue,
    LoadFalse,
    LoadZero, // 整数 0 优化
    LoadOne,  // 整数 1 优化

    LoadSmallInt = 0x18, // + i8 立即数
    LoadToken = 0x19,    // + u8 单元内标识符下标

    // ===== 栈操作 (0x20-0x2F) =====
    Pop = 0x20,
    Dup,
    Swap,

    // ===== 局部变量 (0x30-0x4F) =====
    LoadLocal0 = 0x30,
    LoadLocal1,
    LoadLocal2,
    LoadLocal3,
    LoadLocal = 0x38, // + u8 槽位

    StoreLocal0 = 0x40,
    StoreLocal1,
    StoreLocal2,
    StoreLocal3,
    StoreLocal = 0x48, // + u8 槽位

    // ===== 全局变量 (0x50-0x5F) =====
    LoadGlobal = 0x50, // + u8 槽位
    StoreGlobal,       // + u8 槽位

    // ===== 算术运算 (0x60-0x6F) =====
    Add = 0x60,
    Sub,
    Mul,
    Div,

    Neg = 0x68, // 一元取负

    // ===== 比较/逻辑 (0x70-0x7F) =====
    Equal = 0x70,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    Not = 0x78,

    // ===== 控制流 (0x80-0x8F) =====
    Jump = 0x80,  // + i16 偏移
    JumpIfFalse,  // + i16 偏移
    JumpBack,     // + i16 偏移 (负向跳转)

    // ===== 保护区域与异常 (0x90-0x9F) =====
    SetupExcept = 0x90,  // + i16 处理器偏移，压入 except 类处理器条目
    SetupFinally = 0x91, // + i16 处理器偏移，压入 finally 类处理器条目
    PopBlock = 0x92,     // 正常离开保护体，弹出处理器条目
    PopExcept = 0x93,    // 离开 except 块，恢复先前活跃异常
    EndFinally = 0x94,   // finally 块结束：有挂起异常则续传，否则落空

    NewExc = 0x98, // 弹出消息与种类标识符，压入异常对象
    Raise = 0x99,  // 弹出异常值并抛出

    // ===== 调用与对象 (0xA0-0xAF) =====
    Call = 0xA0, // + u8 参数个数

    BuildList = 0xA8, // + u8 元素个数
    IndexGet = 0xA9,  // 列表索引读取

    // ===== 挂起与终止 (0xC0-0xCF) =====
    Yield = 0xC0,  // 弹出 TOS，挂起当前帧
    Return = 0xC1, // 弹出 TOS，结束当前帧

    // ===== 调试 (0xF0-0xFF) =====
    Print = 0xF0, // 调试用
    Invalid = 0xFF,
}

impl OpCode {
    /// 获取操作码名称
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::LoadConst0 => "LOAD_CONST_0",
            OpCode::LoadConst1 => "LOAD_CONST_1",
            OpCode::LoadConst2 => "LOAD_CONST_2",
            OpCode::LoadConst3 => "LOAD_CONST_3",
            OpCode::LoadConst => "LOAD_CONST",
            OpCode::LoadConstWide => "LOAD_CONST_WIDE",
            OpCode::LoadNone => "LOAD_NONE",
            OpCode::LoadTrue => "LOAD_TRUE",
            OpCode::LoadFalse => "LOAD_FALSE",
            OpCode::LoadZero => "LOAD_ZERO",
            OpCode::LoadOne => "LOAD_ONE",
            OpCode::LoadSmallInt => "LOAD_SMALL_INT",
            OpCode::LoadToken => "LOAD_TOKEN",
            OpCode::Pop => "POP",
            OpCode::Dup => "DUP",
            OpCode::Swap => "SWAP",
            OpCode::LoadLocal0 => "LOAD_LOCAL_0",
            OpCode::LoadLocal1 => "LOAD_LOCAL_1",
            OpCode::LoadLocal2 => "LOAD_LOCAL_2",
            OpCode::LoadLocal3 => "LOAD_LOCAL_3",
            OpCode::LoadLocal => "LOAD_LOCAL",
            OpCode::StoreLocal0 => "STORE_LOCAL_0",
            OpCode::StoreLocal1 => "STORE_LOCAL_1",
            OpCode::StoreLocal2 => "STORE_LOCAL_2",
            OpCode::StoreLocal3 => "STORE_LOCAL_3",
            OpCode::StoreLocal => "STORE_LOCAL",
            OpCode::LoadGlobal => "LOAD_GLOBAL",
            OpCode::StoreGlobal => "STORE_GLOBAL",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Neg => "NEG",
            OpCode::Equal => "EQUAL",
            OpCode::NotEqual => "NOT_EQUAL",
            OpCode::Greater => "GREATER",
            OpCode::GreaterEqual => "GREATER_EQUAL",
            OpCode::Less => "LESS",
            OpCode::LessEqual => "LESS_EQUAL",
            OpCode::Not => "NOT",
            OpCode::Jump => "JUMP",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE",
            OpCode::JumpBack => "JUMP_BACK",
            OpCode::SetupExcept => "SETUP_EXCEPT",
            OpCode::SetupFinally => "SETUP_FINALLY",
            OpCode::PopBlock => "POP_BLOCK",
            OpCode::PopExcept => "POP_EXCEPT",
            OpCode::EndFinally => "END_FINALLY",
            OpCode::NewExc => "NEW_EXC",
            OpCode::Raise => "RAISE",
            OpCode::Call => "CALL",
            OpCode::BuildList => "BUILD_LIST",
            OpCode::IndexGet => "INDEX_GET",
            OpCode::Yield => "YIELD",
            OpCode::Return => "RETURN",
            OpCode::Print => "PRINT",
            OpCode::Invalid => "INVALID",
        }
    }

    /// 操作数大小 (bytes)
    pub fn operand_size(&self) -> usize {
        match self {
            // 无操作数
            OpCode::LoadConst0
            | OpCode::LoadConst1
            | OpCode::LoadConst2
            | OpCode::LoadConst3
            | OpCode::LoadNone
            | OpCode::LoadTrue
            | OpCode::LoadFalse
            | OpCode::LoadZero
            | OpCode::LoadOne
            | OpCode::Pop
            | OpCode::Dup
            | OpCode::Swap
            | OpCode::LoadLocal0
            | OpCode::LoadLocal1
            | OpCode::LoadLocal2
            | OpCode::LoadLocal3
            | OpCode::StoreLocal0
            | OpCode::StoreLocal1
            | OpCode::StoreLocal2
            | OpCode::StoreLocal3
            | OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Neg
            | OpCode::Equal
            | OpCode::NotEqual
            | OpCode::Greater
            | OpCode::GreaterEqual
            | OpCode::Less
            | OpCode::LessEqual
            | OpCode::Not
            | OpCode::PopBlock
            | OpCode::PopExcept
            | OpCode::EndFinally
            | OpCode::NewExc
            | OpCode::Raise
            | OpCode::IndexGet
            | OpCode::Yield
            | OpCode::Return
            | OpCode::Print
            | OpCode::Invalid => 0,

            // u8/i8 操作数
            OpCode::LoadConst
            | OpCode::LoadSmallInt
            | OpCode::LoadToken
            | OpCode::LoadLocal
            | OpCode::StoreLocal
            | OpCode::LoadGlobal
            | OpCode::StoreGlobal
            | OpCode::Call
            | OpCode::BuildList => 1,

            // u16/i16 操作数
            OpCode::LoadConstWide => 2,
            OpCode::Jump | OpCode::JumpIfFalse | OpCode::JumpBack => 2,
            OpCode::SetupExcept | OpCode::SetupFinally => 2,
        }
    }

    /// 从字节解码，未定义的编码返回 None
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        use OpCode::*;
        let op = match byte {
            0x00 => LoadConst0,
            0x01 => LoadConst1,
            0x02 => LoadConst2,
            0x03 => LoadConst3,
            0x08 => LoadConst,
            0x09 => LoadConstWide,
            0x10 => LoadNone,
            0x11 => LoadTrue,
            0x12 => LoadFalse,
            0x13 => LoadZero,
            0x14 => LoadOne,
            0x18 => LoadSmallInt,
            0x19 => LoadToken,
            0x20 => Pop,
            0x21 => Dup,
            0x22 => Swap,
            0x30 => LoadLocal0,
            0x31 => LoadLocal1,
            0x32 => LoadLocal2,
            0x33 => LoadLocal3,
            0x38 => LoadLocal,
            0x40 => StoreLocal0,
            0x41 => StoreLocal1,
            0x42 => StoreLocal2,
            0x43 => StoreLocal3,
            0x48 => StoreLocal,
            0x50 => LoadGlobal,
            0x51 => StoreGlobal,
            0x60 => Add,
            0x61 => Sub,
            0x62 => Mul,
            0x63 => Div,
            0x68 => Neg,
            0x70 => Equal,
            0x71 => NotEqual,
            0x72 => Greater,
            0x73 => GreaterEqual,
            0x74 => Less,
            0x75 => LessEqual,
            0x78 => Not,
            0x80 => Jump,
            0x81 => JumpIfFalse,
            0x82 => JumpBack,
            0x90 => SetupExcept,
            0x91 => SetupFinally,
            0x92 => PopBlock,
            0x93 => PopExcept,
            0x94 => EndFinally,
            0x98 => NewExc,
            0x99 => Raise,
            0xA0 => Call,
            0xA8 => BuildList,
            0xA9 => IndexGet,
            0xC0 => Yield,
            0xC1 => Return,
            0xF0 => Print,
            0xFF => Invalid,
            _ => return None,
        };
        Some(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_name() {
        assert_eq!(OpCode::Add.name(), "ADD");
        assert_eq!(OpCode::LoadConst0.name(), "LOAD_CONST_0");
        assert_eq!(OpCode::SetupExcept.name(), "SETUP_EXCEPT");
        assert_eq!(OpCode::Return.name(), "RETURN");
    }

    #[test]
    fn test_operand_size() {
        assert_eq!(OpCode::Add.operand_size(), 0);
        assert_eq!(OpCode::LoadConst.operand_size(), 1);
        assert_eq!(OpCode::Jump.operand_size(), 2);
        assert_eq!(OpCode::SetupFinally.operand_size(), 2);
    }

    #[test]
    fn test_from_u8_round_trip() {
        for op in [
            OpCode::LoadConst0,
            OpCode::LoadSmallInt,
            OpCode::SetupExcept,
            OpCode::EndFinally,
            OpCode::Raise,
            OpCode::Yield,
            OpCode::Print,
            OpCode::Invalid,
        ] {
            assert_eq!(OpCode::from_u8(op as u8), Some(op));
        }
    }

    #[test]
    fn test_from_u8_rejects_gaps() {
        assert_eq!(OpCode::from_u8(0x04), None);
        assert_eq!(OpCode::from_u8(0x1A), None);
        assert_eq!(OpCode::from_u8(0xE0), None);
    }
}
