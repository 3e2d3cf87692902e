//! 回收器测试
//!
//! 标记清除的可达性、一次回收后重试、OOM 升级与统计口径

mod common;
use common::{push_int, push_str, run_int};

use lumo_core::runtime::{ExcData, MemoryStream, NoRoots, SliceRoots, StreamCaps};
use lumo_core::{
    Constant, Heap, HeapConfig, HeapError, HeapObj, OpCode, Outcome, RuntimeOptions, Unit, Value,
    Vm, VmLimits,
};

fn tiny_heap(max_blocks: usize) -> Heap {
    Heap::new(&HeapConfig { max_blocks })
}

fn str_obj(s: &str) -> HeapObj {
    HeapObj::Str(s.to_string())
}

// ===== 可达性 =====

#[test]
fn test_rooted_objects_survive_collection() {
    let mut heap = tiny_heap(16);
    let id = heap.alloc(str_obj("keep"), &NoRoots).unwrap();
    let roots = [Value::Ref(id)];

    let freed = heap.collect(&SliceRoots(&roots)).unwrap();
    assert_eq!(freed, 0);
    assert_eq!(heap.get(id).unwrap(), &str_obj("keep"));
}

#[test]
fn test_unrooted_objects_are_reclaimed() {
    let mut heap = tiny_heap(16);
    let id = heap.alloc(str_obj("drop"), &NoRoots).unwrap();

    let freed = heap.collect(&NoRoots).unwrap();
    assert_eq!(freed, 1);
    assert!(matches!(heap.get(id), Err(HeapError::InvalidRef { .. })));
}

#[test]
fn test_children_reached_through_container() {
    // 字符串仅通过列表可达
    let mut heap = tiny_heap(16);
    let s = heap.alloc(str_obj("inner"), &NoRoots).unwrap();
    let list = heap
        .alloc(HeapObj::List(vec![Value::Ref(s), Value::Int(1)]), &NoRoots)
        .unwrap();
    let roots = [Value::Ref(list)];

    heap.collect(&SliceRoots(&roots)).unwrap();
    assert_eq!(heap.get(s).unwrap(), &str_obj("inner"));
}

#[test]
fn test_exception_prev_chain_is_traced() {
    let mut heap = tiny_heap(16);
    let cause = heap
        .alloc(
            HeapObj::Exception(ExcData::new(
                lumo_core::core::token::TOK_VALUE_ERROR,
                Some("cause".to_string()),
            )),
            &NoRoots,
        )
        .unwrap();
    let mut top_data = ExcData::new(
        lumo_core::core::token::TOK_TYPE_ERROR,
        Some("effect".to_string()),
    );
    top_data.prev = Value::Ref(cause);
    let top = heap.alloc(HeapObj::Exception(top_data), &NoRoots).unwrap();
    let roots = [Value::Ref(top)];

    heap.collect(&SliceRoots(&roots)).unwrap();
    assert!(heap.get(cause).is_ok());
}

#[test]
fn test_stream_buffers_survive_via_ref() {
    let mut heap = tiny_heap(16);
    let stream = heap
        .alloc(
            HeapObj::Stream(MemoryStream::with_data(b"abc".to_vec(), StreamCaps::READ_WRITE)),
            &NoRoots,
        )
        .unwrap();
    let roots = [Value::Ref(stream)];

    heap.collect(&SliceRoots(&roots)).unwrap();
    assert!(matches!(heap.get(stream).unwrap(), HeapObj::Stream(_)));
}

// ===== 分配压力与 OOM =====

#[test]
fn test_full_heap_collects_once_then_succeeds() {
    // 槽位 0 被 OOM 异常钉住；装满剩余槽位后再分配触发一次回收
    let mut heap = tiny_heap(4);
    for i in 0..3 {
        heap.alloc(str_obj(&format!("junk{i}")), &NoRoots).unwrap();
    }
    assert_eq!(heap.stats().blocks_free, 0);

    let id = heap.alloc(str_obj("after-gc"), &NoRoots).unwrap();
    assert_eq!(heap.get(id).unwrap(), &str_obj("after-gc"));
    assert_eq!(heap.stats().collections, 1);
}

#[test]
fn test_oom_when_roots_hold_everything() {
    let mut heap = tiny_heap(4);
    let mut held = Vec::new();
    for i in 0..3 {
        let id = heap.alloc(str_obj(&format!("live{i}")), &NoRoots).unwrap();
        held.push(Value::Ref(id));
    }

    let err = heap.alloc(str_obj("no room"), &SliceRoots(&held)).unwrap_err();
    assert!(matches!(err, HeapError::OutOfMemory { limit: 4 }));
    // 已有对象原样保留
    for v in &held {
        if let Value::Ref(id) = v {
            assert!(heap.get(*id).is_ok());
        }
    }
}

#[test]
fn test_oom_exception_block_is_pinned() {
    let mut heap = tiny_heap(4);
    let oom = heap.oom_exception();

    heap.collect(&NoRoots).unwrap();
    assert!(matches!(heap.get(oom).unwrap(), HeapObj::Exception(_)));
}

#[test]
fn test_freed_blocks_are_reused() {
    let mut heap = tiny_heap(4);
    let a = heap.alloc(str_obj("a"), &NoRoots).unwrap();
    heap.collect(&NoRoots).unwrap();

    let b = heap.alloc(str_obj("b"), &NoRoots).unwrap();
    // 空闲链表把回收的槽位还回来
    assert_eq!(a, b);
}

#[test]
fn test_stats_counters_track_activity() {
    let mut heap = tiny_heap(8);
    for i in 0..5 {
        heap.alloc(str_obj(&format!("s{i}")), &NoRoots).unwrap();
    }
    let before = heap.stats();
    assert_eq!(before.blocks_used, 6); // 含钉住的 OOM 块
    assert_eq!(before.peak_blocks, 6);

    let freed = heap.collect(&NoRoots).unwrap();
    let after = heap.stats();
    assert_eq!(freed, 5);
    assert_eq!(after.freed_last, 5);
    assert_eq!(after.blocks_used, 1);
    assert_eq!(after.peak_blocks, 6);
    assert_eq!(after.collections, 1);
}

// ===== 脚本驱动的回收 =====

#[test]
fn test_script_survives_gc_pressure() {
    // 堆很小；循环里反复物化字符串常量再丢弃
    let mut unit = Unit::new("main");
    unit.n_locals = 1;
    push_int(&mut unit, 20, 1);
    unit.write_op(OpCode::StoreLocal0, 1);

    let loop_start = unit.code.len();
    unit.write_op(OpCode::LoadLocal0, 2);
    let exit = unit.write_jump(OpCode::JumpIfFalse, 2);
    push_str(&mut unit, "transient", 3);
    unit.write_op(OpCode::Pop, 3);
    unit.write_op(OpCode::LoadLocal0, 4);
    push_int(&mut unit, 1, 4);
    unit.write_op(OpCode::Sub, 4);
    unit.write_op(OpCode::StoreLocal0, 4);
    common::emit_jump_back(&mut unit, loop_start, 4);
    unit.patch_jump(exit);
    push_int(&mut unit, 77, 5);
    unit.write_op(OpCode::Return, 5);

    let mut vm = Vm::with_config(
        &HeapConfig { max_blocks: 4 },
        &VmLimits::default(),
        &RuntimeOptions::default(),
    );
    let outcome = vm.execute(&unit).unwrap();
    assert_eq!(outcome, Outcome::Return(Value::Int(77)));
    assert!(vm.heap_stats().collections >= 1);
}

#[test]
fn test_live_value_survives_allocation_in_flight() {
    // 拼接分配触发回收时，栈上两个操作数必须当根；
    // 先丢一个垃圾对象把堆填满
    let mut unit = Unit::new("main");
    push_str(&mut unit, "junk", 1);
    unit.write_op(OpCode::Pop, 1);
    push_str(&mut unit, "left-", 2);
    push_str(&mut unit, "right", 2);
    unit.write_op(OpCode::Add, 2);
    unit.write_op(OpCode::Return, 2);

    let mut vm = Vm::with_config(
        &HeapConfig { max_blocks: 4 },
        &VmLimits::default(),
        &RuntimeOptions::default(),
    );
    let outcome = vm.execute(&unit).unwrap();
    assert_eq!(vm.heap_stats().collections, 1);
    match outcome {
        Outcome::Return(v) => assert_eq!(vm.render_value(v), "left-right"),
        other => panic!("expected return, got {:?}", other),
    }
}

#[test]
fn test_heap_exhaustion_raises_memory_error() {
    // 两个操作数把堆占满，拼接结果无处安放
    let mut unit = Unit::new("main");
    push_str(&mut unit, "left", 1);
    push_str(&mut unit, "right", 1);
    unit.write_op(OpCode::Add, 1);
    unit.write_op(OpCode::Return, 1);

    let mut vm = Vm::with_config(
        &HeapConfig { max_blocks: 3 },
        &VmLimits::default(),
        &RuntimeOptions::default(),
    );
    let outcome = vm.execute(&unit).unwrap();
    match outcome {
        Outcome::Raised(v) => {
            let data = common::exc_data(&vm, v);
            assert_eq!(common::kind_name(&vm, &data), "MemoryError");
        }
        other => panic!("expected memory error, got {:?}", other),
    }
}

// ===== 原生接口的回收入口 =====

#[test]
fn test_collect_native_reports_freed_count() {
    // 物化两个字符串弃掉，再调用 collect()
    let mut unit = Unit::new("main");
    let tok = unit.add_token("collect");
    push_str(&mut unit, "garbage one", 1);
    unit.write_op(OpCode::Pop, 1);
    push_str(&mut unit, "garbage two", 1);
    unit.write_op(OpCode::Pop, 1);
    unit.write_op_u8(OpCode::LoadGlobal, tok, 2);
    unit.write_op_u8(OpCode::Call, 0, 2);
    unit.write_op(OpCode::Return, 2);

    assert_eq!(run_int(&unit), 2);
}

#[test]
fn test_heap_stats_native_shape() {
    let mut unit = Unit::new("main");
    let stats_tok = unit.add_token("heap_stats");
    let len_tok = unit.add_token("len");
    unit.write_op_u8(OpCode::LoadGlobal, len_tok, 1);
    unit.write_op_u8(OpCode::LoadGlobal, stats_tok, 1);
    unit.write_op_u8(OpCode::Call, 0, 1);
    unit.write_op_u8(OpCode::Call, 1, 1);
    unit.write_op(OpCode::Return, 1);

    assert_eq!(run_int(&unit), 5);
}

#[test]
fn test_host_collect_with_cursor_roots() {
    let mut unit = Unit::new("main");
    let c = unit.add_constant(Constant::Str("host side".to_string()));
    unit.write_op_u8(OpCode::LoadConst, c as u8, 1);
    unit.write_op(OpCode::Return, 1);

    let mut vm = Vm::new();
    let outcome = vm.execute(&unit).unwrap();
    let id = match outcome {
        Outcome::Return(Value::Ref(id)) => id,
        other => panic!("expected ref, got {:?}", other),
    };

    // 宿主不再引用任何游标；空游标作根时返回值对象可被回收
    let freed = vm.collect(&lumo_core::Cursor::default()).unwrap();
    assert!(freed >= 1);
    assert!(vm.heap().get(id).is_err());
}
