//! Program Module Tests
//!
//! ## Test Scopes
//! - **Compiler**: Accepted programs, optional sections and rejected source with
//!   the line it is reported on.
//! - **Artifact**: Opening buffers and rejecting corrupt ones.
//! - **Types**: Tensor construction, arithmetic and metadata.

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::program::artifact::{
        Artifact, Attribute, CompiledBuffer, IMAGE_VERSION, ProgramImage,
    };
    use crate::program::compiler::{CompileOptions, Compiler, TextCompiler};
    use crate::program::types::{
        DType, Tensor, TensorData, TensorMetadata, TypeId, Value, element_count,
    };

    const ADD_ONE: &str = r#"
// Adds one to every element.
func @add_one(%x: !t.tensor) -> (!t.tensor) {
  %one = t.constant() {dtype = i32, shape = [1], value = 1}
  %y = t.add(%x, %one)
  return %y
}

func @context_id(%ctx: !dist.dist_context) -> i64 {
  %id = dist.context_id(%ctx)
  return %id
}
"#;

    fn compile(source: &str, disable_optional_sections: bool) -> Result<Artifact, String> {
        let options = CompileOptions {
            disable_optional_sections,
        };
        let buffer = TextCompiler::new()
            .compile(source, &options)
            .map_err(|d| d.to_string())?;
        Artifact::open(buffer).map_err(|e| e.to_string())
    }

    fn compile_error(source: &str) -> (usize, String) {
        let diagnostic = TextCompiler::new()
            .compile(source, &CompileOptions::default())
            .unwrap_err();
        (diagnostic.line, diagnostic.message)
    }

    // ============================================================
    // TEST 1: Compiler - Accepted Programs
    // ============================================================

    #[test]
    fn test_compile_functions_and_signatures() {
        // ACT
        let artifact = compile(ADD_ONE, true).unwrap();

        // ASSERT
        assert_eq!(artifact.function_names(), vec!["add_one", "context_id"]);

        let add_one = artifact.function("add_one").unwrap();
        assert_eq!(add_one.argument_types(), vec![TypeId::Tensor]);
        assert_eq!(add_one.result_types(), &[TypeId::Tensor]);
        assert_eq!(add_one.body().len(), 2);
        assert_eq!(add_one.returns(), &["y".to_string()]);
        assert!(!add_one.takes_context());

        let constant = &add_one.body()[0];
        assert_eq!(constant.kernel, "t.constant");
        assert_eq!(constant.attributes.get_str("dtype").unwrap(), "i32");
        assert_eq!(
            constant.attributes.get_list("shape").unwrap(),
            &[Attribute::Int(1)]
        );
        assert_eq!(constant.attributes.get_i64("value").unwrap(), 1);

        let context_id = artifact.function("context_id").unwrap();
        assert!(context_id.takes_context());
        assert_eq!(context_id.result_types(), &[TypeId::I64]);

        assert!(artifact.function("missing").is_none());
    }

    #[test]
    fn test_optional_sections() {
        // ARRANGE & ACT
        let stripped = compile(ADD_ONE, true).unwrap();
        let full = compile(ADD_ONE, false).unwrap();

        // ASSERT: Source text only survives when optional sections are kept
        assert!(!stripped.has_debug_info());
        assert!(stripped.source_of("add_one").is_none());

        assert!(full.has_debug_info());
        let source = full.source_of("add_one").unwrap();
        assert!(source.starts_with("func @add_one"));
        assert!(source.ends_with('}'));
        assert!(full.buffer().len() > stripped.buffer().len());
    }

    #[test]
    fn test_compile_no_results_and_multiple_results() {
        let source = r#"
func @noop() -> () {
  return
}
func @pair(%a: i64, %b: i64) -> (i64, i64) {
  %s = i64.add(%a, %b)
  return %s, %a
}
"#;
        let artifact = compile(source, true).unwrap();

        assert_eq!(artifact.function("noop").unwrap().num_results(), 0);
        let pair = artifact.function("pair").unwrap();
        assert_eq!(pair.num_arguments(), 2);
        assert_eq!(pair.result_types(), &[TypeId::I64, TypeId::I64]);
        assert_eq!(pair.returns(), &["s".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_attribute_literals() {
        let source = r#"
func @lits() -> (!t.tensor) {
  %t = t.constant() {dtype = f32, shape = [2, 2], values = [1, 2.5, -3, 4], note = "a, b"}
  return %t
}
"#;
        let artifact = compile(source, true).unwrap();
        let function = artifact.function("lits").unwrap();
        let attrs = &function.body()[0].attributes;

        assert_eq!(attrs.len(), 4);
        assert_eq!(
            attrs.get_list("values").unwrap(),
            &[
                Attribute::Int(1),
                Attribute::Float(2.5),
                Attribute::Int(-3),
                Attribute::Int(4)
            ]
        );
        assert_eq!(attrs.get_str("note").unwrap(), "a, b");
    }

    // ============================================================
    // TEST 2: Compiler - Rejected Programs
    // ============================================================

    #[test]
    fn test_compile_errors_report_line() {
        // Unknown type
        let (line, message) = compile_error("func @f(%x: !t.blob) -> () {\n return\n}");
        assert_eq!(line, 1);
        assert!(message.contains("unknown type"));

        // Undefined operand
        let (line, message) =
            compile_error("func @f() -> (!t.tensor) {\n %y = t.identity(%x)\n return %y\n}");
        assert_eq!(line, 2);
        assert!(message.contains("undefined value %x"));

        // Return count mismatch
        let (line, message) = compile_error("func @f(%x: i64) -> (i64, i64) {\n return %x\n}");
        assert_eq!(line, 2);
        assert!(message.contains("declares 2 results but returns 1"));

        // Missing return
        let (line, message) = compile_error("func @f() -> () {\n}");
        assert_eq!(line, 2);
        assert!(message.contains("no return"));

        // Unterminated function reports its header line
        let (line, message) = compile_error("\nfunc @f() -> () {\n return");
        assert_eq!(line, 2);
        assert!(message.contains("unterminated"));
    }

    #[test]
    fn test_compile_rejects_redefinitions() {
        let (_, message) = compile_error(
            "func @f(%x: i64) -> (i64) {\n %x = i64.add(%x, %x)\n return %x\n}",
        );
        assert!(message.contains("redefinition of %x"));

        let (_, message) = compile_error("func @f(%x: i64, %x: i64) -> () {\n return\n}");
        assert!(message.contains("duplicate parameter"));

        let (line, message) =
            compile_error("func @f() -> () {\n return\n}\nfunc @f() -> () {\n return\n}");
        assert_eq!(line, 4);
        assert!(message.contains("duplicate function @f"));
    }

    #[test]
    fn test_compile_rejects_empty_program() {
        let (line, message) = compile_error("// nothing here\n\n");
        assert_eq!(line, 0);
        assert!(message.contains("no functions"));
    }

    #[test]
    fn test_compile_rejects_garbage() {
        let (line, _) = compile_error("this is not a program");
        assert_eq!(line, 1);

        let (line, message) =
            compile_error("func @f() -> () {\n return\n %y = t.identity()\n}");
        assert_eq!(line, 3);
        assert!(message.contains("after return"));
    }

    // ============================================================
    // TEST 3: Artifact
    // ============================================================

    #[test]
    fn test_open_rejects_bad_buffers() {
        assert!(matches!(
            Artifact::open(CompiledBuffer::empty()),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            Artifact::open(CompiledBuffer::new(vec![0xde, 0xad, 0xbe, 0xef])),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_open_rejects_wrong_version() {
        // ARRANGE: A well-formed image from a newer format
        let mut image = ProgramImage::new(Vec::new(), None);
        image.version = IMAGE_VERSION + 1;
        let buffer = image.encode().unwrap();

        // ACT
        let err = Artifact::open(buffer).unwrap_err();

        // ASSERT
        assert!(err.to_string().contains("Unsupported image version"));
    }

    // ============================================================
    // TEST 4: Types
    // ============================================================

    #[test]
    fn test_type_id_spellings() {
        for ty in [
            TypeId::DistContext,
            TypeId::Tensor,
            TypeId::I32,
            TypeId::I64,
            TypeId::F32,
            TypeId::Chain,
        ] {
            assert_eq!(TypeId::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(TypeId::parse("tensor"), None);
    }

    #[test]
    fn test_tensor_shape_checks() {
        assert!(Tensor::new(vec![2, 2], TensorData::I32(vec![1, 2, 3, 4])).is_ok());
        assert!(Tensor::new(vec![2, 2], TensorData::I32(vec![1, 2, 3])).is_err());
        assert!(Tensor::new(vec![-1], TensorData::I32(vec![])).is_err());

        // Scalars have an empty shape and one element.
        let scalar = Tensor::new(vec![], TensorData::F32(vec![1.0])).unwrap();
        assert_eq!(scalar.num_elements(), 1);
    }

    #[test]
    fn test_element_count_overflow() {
        assert_eq!(element_count(&[]).unwrap(), 1);
        assert_eq!(element_count(&[2, 3, 4]).unwrap(), 24);
        assert_eq!(element_count(&[5, 0]).unwrap(), 0);

        assert!(element_count(&[-2]).is_err());
        assert!(element_count(&[i64::MAX, i64::MAX]).is_err());

        // Product overflows i64 but must not panic in Tensor::new either.
        let err = Tensor::new(vec![1 << 62, 4], TensorData::F32(vec![])).unwrap_err();
        assert!(matches!(err, Error::Kernel(_)));
    }

    #[test]
    fn test_tensor_arithmetic() {
        let a = Tensor::new(vec![2], TensorData::I32(vec![41, 1])).unwrap();
        let b = Tensor::new(vec![2], TensorData::I32(vec![1, 1])).unwrap();

        let sum = a.add(&b).unwrap();
        assert_eq!(sum.data(), &TensorData::I32(vec![42, 2]));
        assert_eq!(a.mul_scalar(2.0).data(), &TensorData::I32(vec![82, 2]));
        assert_eq!(a.add_scalar(-1.0).data(), &TensorData::I32(vec![40, 0]));

        let wrong_shape = Tensor::new(vec![1], TensorData::I32(vec![1])).unwrap();
        assert!(a.add(&wrong_shape).is_err());
        let wrong_dtype = Tensor::new(vec![2], TensorData::F32(vec![1.0, 1.0])).unwrap();
        assert!(a.add(&wrong_dtype).is_err());
    }

    #[test]
    fn test_tensor_metadata() {
        let tensor = Tensor::new(vec![1, 3], TensorData::splat(DType::F32, 3, 0.5)).unwrap();
        let metadata = tensor.metadata();

        assert_eq!(metadata.dtype, DType::F32);
        assert_eq!(metadata.shape, vec![1, 3]);

        let serialized = metadata.serialize().unwrap();
        assert_eq!(serialized, r#"{"dtype":"f32","shape":[1,3]}"#);
        assert_eq!(TensorMetadata::deserialize(&serialized).unwrap(), metadata);
        assert!(TensorMetadata::deserialize("{").is_err());

        assert_eq!(Value::tensor(tensor).type_id(), TypeId::Tensor);
        assert!(Value::I64(1).as_tensor().is_none());
    }
}
