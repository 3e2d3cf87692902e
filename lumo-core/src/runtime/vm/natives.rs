//! 内置原生函数（Runtime 层）
//!
//! 全部通过 `register_native` 绑定为全局。参数只读、驻留在调用者
//! 栈上；分配一律走 `try_alloc`，失败退化为预分配的 MemoryError。

use crate::core::token::{
    TOK_OS_ERROR, TOK_TYPE_ERROR, TOK_UNSUPPORTED_OPERATION, TOK_VALUE_ERROR,
};
use crate::core::{HeapId, Raised, Value};

use super::super::cursor::Cursor;
use super::super::object::HeapObj;
use super::super::stream::{MemoryStream, StreamCaps, StreamError};
use super::Vm;

impl Vm {
    pub(super) fn install_builtins(&mut self) {
        self.register_native("len", native_len);
        self.register_native("collect", native_collect);
        self.register_native("heap_stats", native_heap_stats);
        self.register_native("mem_stream", native_mem_stream);
        self.register_native("stream_read", native_stream_read);
        self.register_native("stream_readall", native_stream_readall);
        self.register_native("stream_readline", native_stream_readline);
        self.register_native("stream_write", native_stream_write);
    }
}

fn arity(vm: &mut Vm, cur: &Cursor, name: &str, want: usize, got: usize) -> Raised {
    vm.raise(
        cur,
        TOK_TYPE_ERROR,
        format!("{name}() takes {want} argument(s), got {got}"),
    )
}

/// 参数必须是流对象，返回其堆引用
fn stream_arg(vm: &mut Vm, cur: &Cursor, v: Value) -> Result<HeapId, Raised> {
    if let Value::Ref(id) = v {
        if matches!(vm.heap().get(id), Ok(HeapObj::Stream(_))) {
            return Ok(id);
        }
    }
    let kind = vm.kind_of(v);
    Err(vm.raise(
        cur,
        TOK_TYPE_ERROR,
        format!("expected a stream, got '{kind}'"),
    ))
}

/// 流层错误到语言级异常的映射
fn raise_stream(vm: &mut Vm, cur: &Cursor, err: StreamError) -> Raised {
    let kind = match err {
        StreamError::Unsupported => TOK_UNSUPPORTED_OPERATION,
        StreamError::Closed => TOK_OS_ERROR,
    };
    vm.raise(cur, kind, err.to_string())
}

fn native_len(vm: &mut Vm, cur: &Cursor, args: &[Value]) -> Result<Value, Raised> {
    let [v] = args else {
        return Err(arity(vm, cur, "len", 1, args.len()));
    };
    let n = match *v {
        Value::Ref(id) => match vm.heap().get(id) {
            Ok(HeapObj::Str(s)) => Some(s.chars().count() as i64),
            Ok(HeapObj::Bytes(bytes)) => Some(bytes.len() as i64),
            Ok(HeapObj::List(items)) => Some(items.len() as i64),
            _ => None,
        },
        _ => None,
    };
    match n {
        Some(n) => Ok(Value::Int(n)),
        None => {
            let kind = vm.kind_of(*v);
            Err(vm.raise(
                cur,
                TOK_TYPE_ERROR,
                format!("object of type '{kind}' has no len()"),
            ))
        }
    }
}

/// 脚本内主动触发一轮回收，返回释放的块数
fn native_collect(vm: &mut Vm, cur: &Cursor, args: &[Value]) -> Result<Value, Raised> {
    if !args.is_empty() {
        return Err(arity(vm, cur, "collect", 0, args.len()));
    }
    match vm.collect(cur) {
        Ok(freed) => Ok(Value::Int(freed as i64)),
        Err(_) => Err(vm.raise(cur, TOK_VALUE_ERROR, "collector busy")),
    }
}

/// 堆计数快照：[used, free, peak, collections, freed_last]
fn native_heap_stats(vm: &mut Vm, cur: &Cursor, args: &[Value]) -> Result<Value, Raised> {
    if !args.is_empty() {
        return Err(arity(vm, cur, "heap_stats", 0, args.len()));
    }
    let stats = vm.heap_stats();
    let items = vec![
        Value::Int(stats.blocks_used as i64),
        Value::Int(stats.blocks_free as i64),
        Value::Int(stats.peak_blocks as i64),
        Value::Int(stats.collections as i64),
        Value::Int(stats.freed_last as i64),
    ];
    let id = vm.try_alloc(cur, HeapObj::List(items))?;
    Ok(Value::Ref(id))
}

/// 创建内存流；可选的初始内容为 str 或 bytes
fn native_mem_stream(vm: &mut Vm, cur: &Cursor, args: &[Value]) -> Result<Value, Raised> {
    let stream = match args {
        [] => MemoryStream::new(StreamCaps::READ_WRITE),
        [v] => {
            let data = match *v {
                Value::Ref(id) => match vm.heap().get(id) {
                    Ok(HeapObj::Str(s)) => Some(s.clone().into_bytes()),
                    Ok(HeapObj::Bytes(bytes)) => Some(bytes.clone()),
                    _ => None,
                },
                _ => None,
            };
            match data {
                Some(data) => MemoryStream::with_data(data, StreamCaps::READ_WRITE),
                None => {
                    let kind = vm.kind_of(*v);
                    return Err(vm.raise(
                        cur,
                        TOK_TYPE_ERROR,
                        format!("mem_stream() initial contents must be str or bytes, not '{kind}'"),
                    ));
                }
            }
        }
        _ => return Err(arity(vm, cur, "mem_stream", 1, args.len())),
    };
    let id = vm.try_alloc(cur, HeapObj::Stream(stream))?;
    Ok(Value::Ref(id))
}

fn native_stream_read(vm: &mut Vm, cur: &Cursor, args: &[Value]) -> Result<Value, Raised> {
    let [sv, nv] = args else {
        return Err(arity(vm, cur, "stream_read", 2, args.len()));
    };
    let sid = stream_arg(vm, cur, *sv)?;
    let n = match nv.as_int() {
        Some(n) if n >= 0 => n as usize,
        _ => {
            return Err(vm.raise(cur, TOK_VALUE_ERROR, "read size must be a non-negative int"));
        }
    };
    let outcome = match vm.heap_mut().get_mut(sid) {
        Ok(HeapObj::Stream(s)) => s.read(n),
        _ => return Err(vm.raise(cur, TOK_VALUE_ERROR, "stale stream reference")),
    };
    match outcome {
        Ok(bytes) => {
            let id = vm.try_alloc(cur, HeapObj::Bytes(bytes))?;
            Ok(Value::Ref(id))
        }
        Err(err) => Err(raise_stream(vm, cur, err)),
    }
}

fn native_stream_readall(vm: &mut Vm, cur: &Cursor, args: &[Value]) -> Result<Value, Raised> {
    let [sv] = args else {
        return Err(arity(vm, cur, "stream_readall", 1, args.len()));
    };
    let sid = stream_arg(vm, cur, *sv)?;
    let outcome = match vm.heap_mut().get_mut(sid) {
        Ok(HeapObj::Stream(s)) => s.readall(),
        _ => return Err(vm.raise(cur, TOK_VALUE_ERROR, "stale stream reference")),
    };
    match outcome {
        Ok(bytes) => {
            let id = vm.try_alloc(cur, HeapObj::Bytes(bytes))?;
            Ok(Value::Ref(id))
        }
        Err(err) => Err(raise_stream(vm, cur, err)),
    }
}

fn native_stream_readline(vm: &mut Vm, cur: &Cursor, args: &[Value]) -> Result<Value, Raised> {
    let [sv] = args else {
        return Err(arity(vm, cur, "stream_readline", 1, args.len()));
    };
    let sid = stream_arg(vm, cur, *sv)?;
    let outcome = match vm.heap_mut().get_mut(sid) {
        Ok(HeapObj::Stream(s)) => s.readline(),
        _ => return Err(vm.raise(cur, TOK_VALUE_ERROR, "stale stream reference")),
    };
    match outcome {
        Ok(bytes) => {
            let id = vm.try_alloc(cur, HeapObj::Bytes(bytes))?;
            Ok(Value::Ref(id))
        }
        Err(err) => Err(raise_stream(vm, cur, err)),
    }
}

/// 写入 str 或 bytes 内容，返回写入的字节数
fn native_stream_write(vm: &mut Vm, cur: &Cursor, args: &[Value]) -> Result<Value, Raised> {
    let [sv, dv] = args else {
        return Err(arity(vm, cur, "stream_write", 2, args.len()));
    };
    let sid = stream_arg(vm, cur, *sv)?;
    let payload: Vec<u8> = {
        let data = match *dv {
            Value::Ref(id) => match vm.heap().get(id) {
                Ok(HeapObj::Str(s)) => Some(s.clone().into_bytes()),
                Ok(HeapObj::Bytes(bytes)) => Some(bytes.clone()),
                _ => None,
            },
            _ => None,
        };
        match data {
            Some(data) => data,
            None => {
                let kind = vm.kind_of(*dv);
                return Err(vm.raise(
                    cur,
                    TOK_TYPE_ERROR,
                    format!("write payload must be str or bytes, not '{kind}'"),
                ));
            }
        }
    };
    let outcome = match vm.heap_mut().get_mut(sid) {
        Ok(HeapObj::Stream(s)) => s.write(&payload),
        _ => return Err(vm.raise(cur, TOK_VALUE_ERROR, "stale stream reference")),
    };
    match outcome {
        Ok(n) => Ok(Value::Int(n as i64)),
        Err(err) => Err(raise_stream(vm, cur, err)),
    }
}
