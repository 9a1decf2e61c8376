//! Proposal Request Builder — validates input and fixes the instructions and
//! output schema for a generation call.

use crate::proposal::error::GenerationError;
use crate::proposal::prompts::{PROPOSAL_SYSTEM, PROPOSAL_USER_PREAMBLE};
use crate::proposal::schema::OutputSchema;

/// Instructions sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    pub system_instructions: String,
    pub user_preamble: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_instructions: PROPOSAL_SYSTEM.to_string(),
            user_preamble: PROPOSAL_USER_PREAMBLE.to_string(),
        }
    }
}

/// One generation request. Immutable; built fresh per submission.
#[derive(Debug, Clone)]
pub struct ProposalRequest {
    instructions: String,
    user_preamble: String,
    job_description: String,
    output_schema: OutputSchema,
}

impl ProposalRequest {
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// The job description exactly as the caller supplied it.
    pub fn job_description(&self) -> &str {
        &self.job_description
    }

    pub fn output_schema(&self) -> &OutputSchema {
        &self.output_schema
    }

    /// The user turn: preamble followed by the untouched job description.
    pub fn user_content(&self) -> String {
        format!("{}{}", self.user_preamble, self.job_description)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProposalRequestBuilder {
    prompts: PromptConfig,
    schema: OutputSchema,
}

impl ProposalRequestBuilder {
    pub fn new(prompts: PromptConfig, schema: OutputSchema) -> Self {
        Self { prompts, schema }
    }

    /// Rejects blank input and a missing credential before any network call.
    pub fn build(
        &self,
        job_description: &str,
        credential: Option<&str>,
    ) -> Result<ProposalRequest, GenerationError> {
        if job_description.trim().is_empty() {
            return Err(GenerationError::InvalidInput);
        }
        if credential.map_or(true, |key| key.trim().is_empty()) {
            return Err(GenerationError::MissingCredential);
        }

        Ok(ProposalRequest {
            instructions: self.prompts.system_instructions.clone(),
            user_preamble: self.prompts.user_preamble.clone(),
            job_description: job_description.to_string(),
            output_schema: self.schema.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JD: &str = "  Looking for a React developer to rebuild our dashboard.\n\nMust know Tailwind.  ";

    #[test]
    fn test_whitespace_only_is_invalid_input() {
        let builder = ProposalRequestBuilder::default();
        for input in ["", " ", "\n\t  \r\n"] {
            assert_eq!(
                builder.build(input, Some("key")).unwrap_err(),
                GenerationError::InvalidInput
            );
        }
    }

    #[test]
    fn test_invalid_input_checked_before_credential() {
        let builder = ProposalRequestBuilder::default();
        assert_eq!(builder.build("   ", None).unwrap_err(), GenerationError::InvalidInput);
    }

    #[test]
    fn test_missing_credential_is_rejected() {
        let builder = ProposalRequestBuilder::default();
        assert_eq!(builder.build(JD, None).unwrap_err(), GenerationError::MissingCredential);
        assert_eq!(
            builder.build(JD, Some("  ")).unwrap_err(),
            GenerationError::MissingCredential
        );
    }

    #[test]
    fn test_job_description_is_not_trimmed_or_mutated() {
        let request = ProposalRequestBuilder::default().build(JD, Some("key")).unwrap();
        assert_eq!(request.job_description(), JD);
        assert!(request.user_content().ends_with(JD));
        assert!(request
            .user_content()
            .starts_with("Analyze the following job description"));
    }

    #[test]
    fn test_custom_prompts_are_used() {
        let builder = ProposalRequestBuilder::new(
            PromptConfig {
                system_instructions: "be brief".to_string(),
                user_preamble: "JOB: ".to_string(),
            },
            OutputSchema::default(),
        );
        let request = builder.build("Rust CLI work", Some("key")).unwrap();
        assert_eq!(request.instructions(), "be brief");
        assert_eq!(request.user_content(), "JOB: Rust CLI work");
    }
}
