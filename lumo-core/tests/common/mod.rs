//! 测试辅助工具
//!
//! 提供手写字节码单元与执行断言的辅助函数

#![allow(dead_code)]

use lumo_core::runtime::ExcData;
use lumo_core::{Constant, HeapObj, OpCode, Outcome, Unit, Value, Vm};

/// 执行单元，保留 VM 以便检视堆
pub fn run(unit: &Unit) -> (Vm, Outcome) {
    let mut vm = Vm::new();
    let outcome = vm.execute(unit).expect("execution faulted");
    (vm, outcome)
}

/// 执行并断言正常返回
pub fn run_ok(unit: &Unit) -> Value {
    let (_, outcome) = run(unit);
    match outcome {
        Outcome::Return(v) => v,
        other => panic!("expected normal return, got {:?}", other),
    }
}

/// 执行并断言返回整数
pub fn run_int(unit: &Unit) -> i64 {
    match run_ok(unit) {
        Value::Int(n) => n,
        other => panic!("expected int, got {:?}", other),
    }
}

/// 执行并断言异常逃逸，返回异常数据
pub fn run_raised(unit: &Unit) -> (Vm, ExcData) {
    let (vm, outcome) = run(unit);
    let value = match outcome {
        Outcome::Raised(v) => v,
        other => panic!("expected escaped exception, got {:?}", other),
    };
    let data = exc_data(&vm, value);
    (vm, data)
}

/// 解析异常引用为数据
pub fn exc_data(vm: &Vm, value: Value) -> ExcData {
    let id = value.as_ref_id().expect("exception value is not a heap ref");
    match vm.heap().get(id).expect("stale exception ref") {
        HeapObj::Exception(data) => data.clone(),
        other => panic!("expected exception object, got {:?}", other),
    }
}

/// 异常种类的标识符名
pub fn kind_name(vm: &Vm, data: &ExcData) -> String {
    vm.tokens().resolve(data.kind).unwrap_or("?").to_string()
}

/// 发射加载整数的最短指令序列
pub fn push_int(unit: &mut Unit, n: i64, line: usize) {
    match n {
        0 => unit.write_op(OpCode::LoadZero, line),
        1 => unit.write_op(OpCode::LoadOne, line),
        -128..=127 => unit.write_op_i8(OpCode::LoadSmallInt, n as i8, line),
        _ => {
            let idx = unit.add_constant(Constant::Int(n));
            unit.write_op_u8(OpCode::LoadConst, idx as u8, line);
        }
    }
}

/// 发射加载字符串常量的指令
pub fn push_str(unit: &mut Unit, s: &str, line: usize) {
    let idx = unit.add_constant(Constant::Str(s.to_string()));
    unit.write_op_u8(OpCode::LoadConst, idx as u8, line);
}

/// 发射回跳指令，目标为已知偏移
pub fn emit_jump_back(unit: &mut Unit, target: usize, line: usize) {
    unit.write_op(OpCode::JumpBack, line);
    let rel = target as i64 - (unit.code.len() as i64 + 2);
    unit.write_i16(rel as i16, line);
}

/// 发射 `raise <Kind>(message)` 的指令序列
pub fn emit_raise(unit: &mut Unit, kind: &str, message: &str, line: usize) {
    let tok = unit.add_token(kind);
    unit.write_op_u8(OpCode::LoadToken, tok, line);
    push_str(unit, message, line);
    unit.write_op(OpCode::NewExc, line);
    unit.write_op(OpCode::Raise, line);
}
