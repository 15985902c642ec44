//! Exam service - contract registration and a typed client.
//!
//! This example demonstrates:
//! - Declaring a contract with a request/response and a zero-request operation
//! - Binding a service's methods to the contract
//! - Writing a typed client on top of `Registry::invoke`
//!
//! # Running
//!
//! ```text
//! RUST_LOG=irpc=debug cargo run --example exam
//! ```

use std::sync::Arc;

use irpc::{
    BoxError, CallError, Context, ContractDescriptor, Implementation, Registry, RegistryConfig,
};
use tracing_subscriber::EnvFilter;

/// Domain record owned by the exam service.
#[derive(Debug, Clone)]
struct Exam {
    id: String,
    name: String,
}

/// Domain service, unaware of irpc.
struct ExamStore;

impl ExamStore {
    fn find_exam_by_id(&self, id: &str) -> Result<Exam, BoxError> {
        Ok(Exam {
            id: id.to_string(),
            name: "Mock Exam".to_string(),
        })
    }

    fn find_all_exams(&self) -> Result<Vec<Exam>, BoxError> {
        Ok((1..=3)
            .map(|i| Exam {
                id: format!("EX-00{}", i),
                name: format!("Exam {}", i),
            })
            .collect())
    }
}

/// Request for `Exam.FindExamById`.
#[derive(Debug, Clone)]
struct ExamRequest {
    id: String,
}

/// Response shared by both operations.
#[derive(Debug, Clone)]
struct ExamResponse {
    id: String,
    name: String,
}

impl From<Exam> for ExamResponse {
    fn from(exam: Exam) -> Self {
        Self {
            id: exam.id,
            name: exam.name,
        }
    }
}

/// Adapter exposing the store through the contract's types.
struct ExamEndpoint {
    store: ExamStore,
}

impl ExamEndpoint {
    fn find_exam_by_id(&self, _ctx: &Context, req: ExamRequest) -> Result<ExamResponse, BoxError> {
        self.store.find_exam_by_id(&req.id).map(ExamResponse::from)
    }

    fn find_all_exams(&self, _ctx: &Context) -> Result<Vec<ExamResponse>, BoxError> {
        let exams = self.store.find_all_exams()?;
        Ok(exams.into_iter().map(ExamResponse::from).collect())
    }
}

fn exam_contract() -> ContractDescriptor {
    ContractDescriptor::new("ExamContract")
        .unary("FindExamById")
        .supplier("FindAllExams")
}

/// Typed client: callers never see payloads or routing keys.
struct ExamClient {
    registry: Arc<Registry>,
}

impl ExamClient {
    fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    fn find_exam_by_id(&self, ctx: &Context, req: ExamRequest) -> Result<ExamResponse, CallError> {
        self.registry.invoke(ctx, "Exam.FindExamById", req)
    }

    fn find_all_exams(&self, ctx: &Context) -> Result<Vec<ExamResponse>, CallError> {
        self.registry.invoke(ctx, "Exam.FindAllExams", ())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let ctx = Context::background();

    // Safe mode: no overrides, every operation must be implemented
    let registry = Arc::new(Registry::new(RegistryConfig::DEFAULT));

    let endpoint = Implementation::new(ExamEndpoint { store: ExamStore })
        .unary("FindExamById", ExamEndpoint::find_exam_by_id)
        .supplier("FindAllExams", ExamEndpoint::find_all_exams);

    registry.register_contract("Exam", &exam_contract(), &endpoint)?;
    registry.validate_impl("Exam", &exam_contract())?;

    let client = ExamClient::new(Arc::clone(&registry));

    let exam = client.find_exam_by_id(
        &ctx,
        ExamRequest {
            id: "EX-123".to_string(),
        },
    )?;
    println!("FindExamById: {} {}", exam.id, exam.name);

    println!("FindAllExams:");
    for exam in client.find_all_exams(&ctx)? {
        println!("- {} {}", exam.id, exam.name);
    }

    println!("{}", registry.schema().to_json()?);

    Ok(())
}
