//! Non-local exits produced by statement execution
//!
//! Errors travel through `Err`; these signals travel through `Ok` so that
//! exception handlers never see them.

use super::Value;

/// Identity of one function invocation
pub type CallId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Fall through to the next statement
    Next,
    /// Leave the innermost loop
    Break,
    /// Start the next iteration of the innermost loop
    Continue,
    /// Leave the function whose call id is `owner` (`None` = top level)
    Return { value: Value, owner: Option<CallId> },
}

impl Flow {
    pub fn is_next(&self) -> bool {
        matches!(self, Flow::Next)
    }
}

/// What a loop does with its body's outcome
pub(crate) enum LoopStep {
    Continue,
    Exit(Flow),
}

impl LoopStep {
    /// Break ends the loop normally; Return propagates; Continue and Next iterate
    pub(crate) fn from_body(flow: Flow) -> LoopStep {
        match flow {
            Flow::Next | Flow::Continue => LoopStep::Continue,
            Flow::Break => LoopStep::Exit(Flow::Next),
            ret @ Flow::Return { .. } => LoopStep::Exit(ret),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_step() {
        assert!(matches!(LoopStep::from_body(Flow::Continue), LoopStep::Continue));
        assert!(matches!(LoopStep::from_body(Flow::Break), LoopStep::Exit(Flow::Next)));
        let ret = Flow::Return {
            value: Value::Int(1),
            owner: Some(4),
        };
        match LoopStep::from_body(ret.clone()) {
            LoopStep::Exit(f) => assert_eq!(f, ret),
            LoopStep::Continue => panic!("return must leave the loop"),
        }
    }
}
