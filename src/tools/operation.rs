//! Arithmetic tool
//!
//! Performs one of the four basic operations on two numbers.

use async_trait::async_trait;
use serde::Deserialize;

use crate::tools::tool::{Tool, ToolContext};

const INVALID_OPERATION: &str =
    "Please specify a valid operation: 'add', 'subtract', 'multiply' or 'divide'";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Deserialize)]
struct OperationParams {
    operation: Operation,
    number1: f64,
    number2: f64,
}

/// Tool for basic arithmetic
#[derive(Debug, Clone, Default)]
pub struct OperationTool;

impl OperationTool {
    /// Create a new operation tool
    pub fn new() -> Self {
        Self
    }

    fn compute(params: &OperationParams) -> String {
        let (a, b) = (params.number1, params.number2);
        match params.operation {
            Operation::Add => format!("The result of adding {} and {} is {}", a, b, a + b),
            Operation::Subtract => {
                format!("The result of subtracting {} from {} is {}", b, a, a - b)
            }
            Operation::Multiply => {
                format!("The result of multiplying {} by {} is {}", a, b, a * b)
            }
            Operation::Divide if b == 0.0 => format!("Cannot divide {} by zero", a),
            Operation::Divide => format!("The result of dividing {} by {} is {}", a, b, a / b),
        }
    }
}

#[async_trait]
impl Tool for OperationTool {
    fn name(&self) -> &str {
        "OperationTool"
    }

    fn description(&self) -> &str {
        "Use this tool to perform arithmetic. Specify the operation you want \
         ('add', 'subtract', 'multiply' or 'divide') and the two numbers to operate on."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide"],
                    "description": "The operation to perform"
                },
                "number1": {
                    "type": "number",
                    "description": "The first operand"
                },
                "number2": {
                    "type": "number",
                    "description": "The second operand"
                }
            },
            "required": ["operation", "number1", "number2"]
        })
    }

    async fn run(&self, parameters: serde_json::Value, _context: ToolContext) -> String {
        match serde_json::from_value::<OperationParams>(parameters) {
            Ok(params) => Self::compute(&params),
            Err(_) => INVALID_OPERATION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::run_state::DelegationStack;
    use crate::core::Identity;

    fn run(parameters: serde_json::Value) -> String {
        let context = ToolContext::new(
            Identity::new("asst_1", "MathAgent"),
            "thread_1",
            DelegationStack::root(),
        );
        tokio_test::block_on(OperationTool::new().run(parameters, context))
    }

    #[test]
    fn test_add() {
        let out = run(serde_json::json!({"operation": "add", "number1": 2, "number2": 3}));
        assert_eq!(out, "The result of adding 2 and 3 is 5");
    }

    #[test]
    fn test_divide() {
        let out = run(serde_json::json!({"operation": "divide", "number1": 7, "number2": 2}));
        assert_eq!(out, "The result of dividing 7 by 2 is 3.5");

        let out = run(serde_json::json!({"operation": "divide", "number1": 7, "number2": 0}));
        assert!(out.contains("zero"));
    }

    #[test]
    fn test_invalid_operation() {
        let out = run(serde_json::json!({"operation": "power", "number1": 2, "number2": 3}));
        assert_eq!(out, INVALID_OPERATION);
    }
}
