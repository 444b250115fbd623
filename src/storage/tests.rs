//! Storage Module Tests
//!
//! Validates the session state a request handler works against.
//!
//! ## Test Scopes
//! - **Object ids**: Equality, hashing and wire resolution.
//! - **RemoteObjectStore**: Put/get, the unresolved-object sentinel and eviction.
//! - **ProgramCache**: Registration, last-write-wins and failed opens.

#[cfg(test)]
mod tests {
    use crate::engine::executor::ExecutionEngine;
    use crate::error::Error;
    use crate::host::async_value::{AsyncValue, AsyncValueRef};
    use crate::host::device::{Device, DeviceManager};
    use crate::program::artifact::{CompiledBuffer, Function};
    use crate::program::compiler::{CompileOptions, Compiler, TextCompiler};
    use crate::program::types::Value;
    use crate::storage::object_id::RemoteObjectId;
    use crate::storage::program_cache::ProgramCache;
    use crate::storage::protocol::RemoteObjectIdProto;
    use crate::storage::remote_objects::RemoteObjectStore;
    use std::collections::HashSet;
    use std::sync::Arc;

    /// Engine that can open artifacts but never runs anything.
    struct OpenOnlyEngine;

    impl ExecutionEngine for OpenOnlyEngine {
        fn execute(
            &self,
            _function: &Arc<Function>,
            _arguments: Vec<AsyncValueRef<Value>>,
        ) -> Vec<AsyncValueRef<Value>> {
            Vec::new()
        }
    }

    fn id(prefix_id: i32, local_id: i64) -> RemoteObjectId {
        RemoteObjectId::new(prefix_id, local_id, Arc::new(Device::new("CPU:0")))
    }

    fn compiled(source: &str) -> CompiledBuffer {
        TextCompiler::new()
            .compile(source, &CompileOptions::default())
            .unwrap()
    }

    // ============================================================
    // OBJECT ID TESTS
    // ============================================================

    #[test]
    fn test_object_id_equality_uses_device_name() {
        // ARRANGE: Same device name, different handles
        let a = RemoteObjectId::new(1, 2, Arc::new(Device::new("CPU:0")));
        let b = RemoteObjectId::new(1, 2, Arc::new(Device::new("CPU:0")));
        let c = RemoteObjectId::new(1, 2, Arc::new(Device::new("GPU:0")));

        // ASSERT
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, id(1, 3));
        assert_ne!(a, id(2, 2));

        let set: HashSet<RemoteObjectId> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_object_id_display() {
        assert_eq!(id(3, 14).to_string(), "3:14@CPU:0");
    }

    #[test]
    fn test_proto_resolution() {
        let devices = DeviceManager::with_devices(&["CPU:0"]);

        let resolved = RemoteObjectIdProto::new(1, 5, "CPU:0")
            .resolve(&devices)
            .unwrap();
        assert_eq!(resolved, id(1, 5));

        let err = RemoteObjectIdProto::new(1, 5, "GPU:7")
            .resolve(&devices)
            .unwrap_err();
        assert_eq!(err, Error::UnknownDevice("GPU:7".to_string()));
    }

    // ============================================================
    // REMOTE OBJECT STORE TESTS
    // ============================================================

    #[test]
    fn test_put_and_get_same_handle() {
        // ARRANGE
        let store = RemoteObjectStore::new();
        let value = AsyncValue::<Value>::pending();

        // ACT
        store.put(id(0, 1), value.clone());
        let fetched = store.get(&id(0, 1));

        // ASSERT: The stored handle itself comes back, still pending
        assert!(Arc::ptr_eq(&value, &fetched));
        assert!(!fetched.is_ready());

        value.set_value(Value::I64(5));
        assert_eq!(store.get(&id(0, 1)).get(), Some(Ok(Value::I64(5))));
    }

    #[test]
    fn test_get_unknown_returns_errored_sentinel() {
        // ARRANGE
        let store = RemoteObjectStore::new();

        // ACT
        let value = store.get(&id(9, 9));

        // ASSERT: Errored, never pending, and the store is unchanged
        assert!(value.is_error());
        assert_eq!(value.get(), Some(Err(Error::UnresolvedObject(id(9, 9)))));
        assert!(store.is_empty());
        assert!(store.lookup(&id(9, 9)).is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let store = RemoteObjectStore::new();

        store.put(id(0, 1), AsyncValue::available(Value::I64(1)));
        store.put(id(0, 1), AsyncValue::available(Value::I64(2)));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id(0, 1)).get(), Some(Ok(Value::I64(2))));
    }

    #[test]
    fn test_evict_prefix_and_clear() {
        // ARRANGE
        let store = RemoteObjectStore::new();
        for local_id in 0..3 {
            store.put(id(1, local_id), AsyncValue::available(Value::Chain));
        }
        store.put(id(2, 0), AsyncValue::available(Value::Chain));

        // ACT
        let removed = store.evict_prefix(1);

        // ASSERT
        assert_eq!(removed, 3);
        assert_eq!(store.len(), 1);
        assert!(store.contains(&id(2, 0)));
        assert_eq!(store.evict_prefix(1), 0);

        assert_eq!(store.clear(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_state_counts() {
        let store = RemoteObjectStore::new();
        store.put(id(0, 0), AsyncValue::pending());
        store.put(id(0, 1), AsyncValue::available(Value::I32(1)));
        store.put(id(0, 2), AsyncValue::available(Value::I32(2)));
        store.put(id(0, 3), AsyncValue::error(Error::kernel("x")));

        assert_eq!(store.state_counts(), (1, 2, 1));

        assert!(store.remove(&id(0, 0)).is_some());
        assert!(store.remove(&id(0, 0)).is_none());
        assert_eq!(store.state_counts(), (0, 2, 1));
    }

    // ============================================================
    // PROGRAM CACHE TESTS
    // ============================================================

    #[test]
    fn test_register_and_lookup() {
        // ARRANGE
        let cache = ProgramCache::new();
        let buffer = compiled("func @f() -> () {\n return\n}");

        // ACT
        cache.register("prog", buffer.clone(), &OpenOnlyEngine).unwrap();

        // ASSERT
        assert!(cache.contains("prog"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.buffer("prog"), Some(buffer));
        assert!(cache.lookup("prog").unwrap().function("f").is_some());
        assert!(cache.lookup("other").is_none());
    }

    #[test]
    fn test_register_last_write_wins() {
        let cache = ProgramCache::new();

        cache
            .register("prog", compiled("func @first() -> () {\n return\n}"), &OpenOnlyEngine)
            .unwrap();
        cache
            .register("prog", compiled("func @second() -> () {\n return\n}"), &OpenOnlyEngine)
            .unwrap();

        let artifact = cache.lookup("prog").unwrap();
        assert_eq!(artifact.function_names(), vec!["second"]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_open_leaves_cache_untouched() {
        // ARRANGE: A good program already under the name
        let cache = ProgramCache::new();
        cache
            .register("prog", compiled("func @f() -> () {\n return\n}"), &OpenOnlyEngine)
            .unwrap();

        // ACT: Re-register with a corrupt buffer
        let err = cache
            .register("prog", CompiledBuffer::new(vec![1, 2, 3]), &OpenOnlyEngine)
            .unwrap_err();

        // ASSERT
        assert!(matches!(err, Error::Compile { ref program, .. } if program == "prog"));
        assert!(cache.lookup("prog").unwrap().function("f").is_some());

        assert!(cache.register("fresh", CompiledBuffer::empty(), &OpenOnlyEngine).is_err());
        assert!(!cache.contains("fresh"));
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = ProgramCache::new();
        for name in ["b", "a", "c"] {
            cache
                .register(name, compiled("func @f() -> () {\n return\n}"), &OpenOnlyEngine)
                .unwrap();
        }

        assert_eq!(cache.program_names(), vec!["a", "b", "c"]);
        assert!(cache.remove("b"));
        assert!(!cache.remove("b"));
        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
    }
}
