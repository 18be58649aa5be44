//! `queue.*` builtins

use super::{arg, BuiltinInfo, NativeModule};
use crate::arrays::{ArrayDef, QueueDef};
use crate::interp::{InterpResult, RuntimeError, Shared, Value};
use crate::types::DataType;

pub(super) fn module() -> NativeModule {
    let q = |name: &str, ret: Option<DataType>| {
        BuiltinInfo::new(name, ret).param("queue", DataType::Queue)
    };
    NativeModule::new("queue")
        .function(q("queue.enqueue", None).param("value", DataType::Any), enqueue)
        .function(q("queue.dequeue", Some(DataType::Any)), dequeue)
        .function(q("queue.peek", Some(DataType::Any)), peek)
        .function(q("queue.isEmpty", Some(DataType::Bool)), is_empty)
        .function(q("queue.size", Some(DataType::Int)), size)
        .function(q("queue.clear", None), clear)
        .function(q("queue.contains", Some(DataType::Bool)).param("value", DataType::Any), contains)
        .function(q("queue.toArray", Some(DataType::Array)), to_array)
}

fn queue_arg<'a>(args: &'a [Value], func: &str) -> InterpResult<&'a Shared<QueueDef>> {
    match arg(args, 0) {
        Value::Queue(q) => Ok(q),
        Value::Null => Err(RuntimeError::null_access(format!(
            "{func}: queue cannot be null"
        ))),
        other => Err(RuntimeError::type_mismatch(format!(
            "{func}: first argument must be a queue, got: {}",
            other.type_name()
        ))),
    }
}

fn enqueue(args: &[Value]) -> InterpResult<Value> {
    let q = queue_arg(args, "queue.enqueue")?;
    q.write().enqueue(arg(args, 1).clone())?;
    Ok(Value::Null)
}

fn dequeue(args: &[Value]) -> InterpResult<Value> {
    let q = queue_arg(args, "queue.dequeue")?;
    let value = q.write().dequeue()?;
    Ok(value)
}

fn peek(args: &[Value]) -> InterpResult<Value> {
    let q = queue_arg(args, "queue.peek")?;
    let value = q.read().peek()?;
    Ok(value)
}

fn is_empty(args: &[Value]) -> InterpResult<Value> {
    let q = queue_arg(args, "queue.isEmpty")?;
    let empty = q.read().is_empty();
    Ok(Value::Bool(empty))
}

fn size(args: &[Value]) -> InterpResult<Value> {
    let q = queue_arg(args, "queue.size")?;
    let len = q.read().size();
    Ok(Value::Int(len as i32))
}

fn clear(args: &[Value]) -> InterpResult<Value> {
    queue_arg(args, "queue.clear")?.write().clear();
    Ok(Value::Null)
}

fn contains(args: &[Value]) -> InterpResult<Value> {
    let q = queue_arg(args, "queue.contains")?;
    let found = q.read().contains(arg(args, 1));
    Ok(Value::Bool(found))
}

/// Dynamic array of the queue's element type, front first
fn to_array(args: &[Value]) -> InterpResult<Value> {
    let q = queue_arg(args, "queue.toArray")?;
    let (elem, items) = {
        let guard = q.read();
        (guard.elem_type(), guard.to_vec())
    };
    Ok(Value::array(ArrayDef::from_values(elem, items)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;

    fn int_queue() -> Value {
        Value::queue(QueueDef::new(DataType::Int))
    }

    #[test]
    fn test_fifo_order() {
        let q = int_queue();
        enqueue(&[q.clone(), Value::Int(1)]).unwrap();
        enqueue(&[q.clone(), Value::from("2")]).unwrap();
        assert_eq!(size(&[q.clone()]).unwrap(), Value::Int(2));
        assert_eq!(peek(&[q.clone()]).unwrap(), Value::Int(1));
        assert_eq!(dequeue(&[q.clone()]).unwrap(), Value::Int(1));
        assert_eq!(contains(&[q.clone(), Value::Int(2)]).unwrap(), Value::Bool(true));
        assert_eq!(dequeue(&[q.clone()]).unwrap(), Value::Int(2));
        assert_eq!(is_empty(&[q]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_dequeue_empty() {
        let err = dequeue(&[int_queue()]).unwrap_err();
        assert_eq!(err.message, "Queue is empty");
        let err = peek(&[int_queue()]).unwrap_err();
        assert_eq!(err.message, "Queue is empty");
    }

    #[test]
    fn test_bad_target() {
        let err = size(&[Value::Null]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NullAccess);
        assert_eq!(err.message, "queue.size: queue cannot be null");
        let err = size(&[Value::Int(1)]).unwrap_err();
        assert_eq!(err.message, "queue.size: first argument must be a queue, got: int");
    }

    #[test]
    fn test_to_array_and_clear() {
        let q = int_queue();
        enqueue(&[q.clone(), Value::Int(7)]).unwrap();
        enqueue(&[q.clone(), Value::Int(8)]).unwrap();
        let arr = to_array(&[q.clone()]).unwrap();
        assert_eq!(arr.to_string(), "[7, 8]");
        clear(&[q.clone()]).unwrap();
        assert_eq!(size(&[q]).unwrap(), Value::Int(0));
    }
}
