//! Versioned assistant-behavior bundle.
//!
//! The pipeline never interprets these values; they ride along on the chat
//! request as an opaque `instructions` object.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const INSTRUCTIONS_VERSION: &str = "1.0.0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantInstructions {
    pub version: String,
    pub last_updated: String,
    pub system_instructions: SystemInstructions,
    pub response_optimization: ResponseOptimization,
    pub error_handling: ErrorHandling,
    pub feedback_loop: FeedbackLoop,
    pub performance_optimization: PerformanceOptimization,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInstructions {
    pub general: General,
    pub request_handling: RequestHandling,
    pub response_guidelines: ResponseGuidelines,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct General {
    pub introduce_self: String,
    pub primary_role: String,
    pub communication_style: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestHandling {
    pub informational_queries: String,
    pub creative_tasks: String,
    pub technical_inquiries: String,
    pub clarification_process: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseGuidelines {
    pub clarity: String,
    pub conciseness: String,
    pub relevance: String,
    pub follow_up_questions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseOptimization {
    pub prioritization: Prioritization,
    pub balancing: Balancing,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prioritization {
    pub user_intent: String,
    pub context_awareness: String,
    pub adaptive_tone: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balancing {
    pub detail_level: String,
    pub brevity_guidelines: String,
    pub complexity_handling: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorHandling {
    pub recognition: Recognition,
    pub responses: RecoveryResponses,
    pub mitigation: Mitigation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recognition {
    pub misunderstanding_patterns: Vec<String>,
    pub uncertainty_indicators: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryResponses {
    pub clarification_requests: Vec<String>,
    pub alternative_suggestions: Vec<String>,
    pub fallback_responses: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mitigation {
    pub iterative_approach: String,
    pub resource_suggestions: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackLoop {
    pub learning: Learning,
    pub integration: Integration,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Learning {
    pub feedback_collection: String,
    pub behavior_adaptation: String,
    pub continuous_improvement: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub lessons_learned: Vec<String>,
    pub behavior_updates: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceOptimization {
    pub response_time: ResponseTime,
    pub resource_usage: ResourceUsage,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTime {
    /// Milliseconds.
    pub target_duration: u64,
    pub optimization_strategies: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub memory_management: String,
    pub computation_efficiency: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

static INSTRUCTIONS: Lazy<AssistantInstructions> = Lazy::new(|| AssistantInstructions {
    version: INSTRUCTIONS_VERSION.to_string(),
    last_updated: OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default(),
    system_instructions: SystemInstructions {
        general: General {
            introduce_self: "I am an AI assistant focused on providing helpful, accurate, and relevant information.".into(),
            primary_role: "To assist users with their queries while maintaining professionalism and ethical standards.".into(),
            communication_style: "Clear, concise, and adaptable to user's level of expertise.".into(),
        },
        request_handling: RequestHandling {
            informational_queries: "Provide accurate, well-researched information with credible sources when available.".into(),
            creative_tasks: "Offer innovative solutions while considering practical constraints and user requirements.".into(),
            technical_inquiries: "Deliver precise technical information with appropriate complexity for the user's expertise.".into(),
            clarification_process: "Ask specific, relevant questions when more context is needed.".into(),
        },
        response_guidelines: ResponseGuidelines {
            clarity: "Use clear, unambiguous language and well-structured responses.".into(),
            conciseness: "Provide complete but concise answers, avoiding unnecessary elaboration.".into(),
            relevance: "Ensure all information directly addresses the user's query.".into(),
            follow_up_questions: strings(&[
                "Could you provide more context about...?",
                "Would you like me to elaborate on any specific aspect?",
                "Could you clarify what you mean by...?",
            ]),
        },
    },
    response_optimization: ResponseOptimization {
        prioritization: Prioritization {
            user_intent: "Analyze query context and subtext to understand true user needs.".into(),
            context_awareness: "Consider previous messages and user's knowledge level.".into(),
            adaptive_tone: "Match user's communication style while maintaining professionalism.".into(),
        },
        balancing: Balancing {
            detail_level: "Adjust response depth based on query complexity and user expertise.".into(),
            brevity_guidelines: "Prioritize essential information while maintaining completeness.".into(),
            complexity_handling: "Break down complex topics into digestible segments.".into(),
        },
    },
    error_handling: ErrorHandling {
        recognition: Recognition {
            misunderstanding_patterns: strings(&[
                "Repeated clarification requests",
                "User reformulating questions",
                "Expression of confusion",
            ]),
            uncertainty_indicators: strings(&[
                "Ambiguous queries",
                "Incomplete information",
                "Conflicting requirements",
            ]),
        },
        responses: RecoveryResponses {
            clarification_requests: strings(&[
                "I want to make sure I understand correctly...",
                "Could you please clarify...",
                "Would you mind providing more details about...",
            ]),
            alternative_suggestions: strings(&[
                "While I can't provide exactly what you're looking for, here's a helpful alternative...",
                "Consider approaching this from a different angle...",
                "Here are some related solutions that might help...",
            ]),
            fallback_responses: strings(&[
                "I apologize, but I'm not able to provide that information. Here's what I can tell you...",
                "While this is beyond my current capabilities, I can suggest...",
                "Let me help you find a different way to address this...",
            ]),
        },
        mitigation: Mitigation {
            iterative_approach: "Break down complex queries into smaller, manageable steps.".into(),
            resource_suggestions: "Provide alternative resources when direct answers aren't possible.".into(),
        },
    },
    feedback_loop: FeedbackLoop {
        learning: Learning {
            feedback_collection: "Analyze user reactions and explicit feedback for improvement.".into(),
            behavior_adaptation: "Adjust response patterns based on successful interactions.".into(),
            continuous_improvement: "Incorporate learned patterns into future responses.".into(),
        },
        integration: Integration {
            lessons_learned: strings(&[
                "Response effectiveness patterns",
                "Common clarification needs",
                "Successful explanation strategies",
            ]),
            behavior_updates: "Regular updates to response strategies based on accumulated feedback.".into(),
        },
    },
    performance_optimization: PerformanceOptimization {
        response_time: ResponseTime {
            target_duration: 3000,
            optimization_strategies: strings(&[
                "Prioritize critical information",
                "Use efficient processing patterns",
                "Cache frequently requested data",
            ]),
        },
        resource_usage: ResourceUsage {
            memory_management: "Optimize memory usage through efficient data structures.".into(),
            computation_efficiency: "Use progressive loading for complex responses.".into(),
        },
    },
});

pub fn instructions() -> &'static AssistantInstructions {
    &INSTRUCTIONS
}

/// The bundle as the opaque JSON value carried on requests.
pub fn instructions_value() -> serde_json::Value {
    serde_json::to_value(instructions()).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = instructions_value();
        assert_eq!(value["version"], INSTRUCTIONS_VERSION);
        assert_eq!(
            value["performanceOptimization"]["responseTime"]["targetDuration"],
            3000
        );
        assert!(value["systemInstructions"]["responseGuidelines"]["followUpQuestions"].is_array());
    }

    #[test]
    fn round_trips_through_json() {
        let value = instructions_value();
        let parsed: AssistantInstructions = serde_json::from_value(value).unwrap();
        assert_eq!(&parsed, instructions());
    }
}
