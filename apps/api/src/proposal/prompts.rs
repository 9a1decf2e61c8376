// Prompt constants for proposal generation.
// Injected through `PromptConfig` so tests and deployments can substitute them.

/// System prompt. Enforces JSON-only output and the proposal persona.
pub const PROPOSAL_SYSTEM: &str = "You are a world-class AI designed to help highly-rated \
    Upwork freelancers. Your task is to analyze the user's job description and return a \
    structured JSON object containing a brief summary of client needs, a professional \
    proposal draft, and a list of key skills. The proposal draft MUST be persuasive, \
    professional, and directly address the key requirements mentioned in the job post. \
    Do not add any introductory or concluding text outside of the JSON object.";

/// Prepended to the job description to form the user turn.
pub const PROPOSAL_USER_PREAMBLE: &str = "Analyze the following job description and generate \
    the structured proposal components:\n\n---JOB DESCRIPTION---\n";

// Field descriptions sent with the response schema.

pub const CLIENT_SUMMARY_DESCRIPTION: &str =
    "2-3 highly concise bullet points summarizing the core client needs and deliverables.";

pub const PROPOSAL_DRAFT_DESCRIPTION: &str = "A professional, persuasive proposal draft \
    (150-250 words) that addresses all client needs and includes a final call to action. \
    Use a friendly, experienced tone.";

pub const SUGGESTED_SKILLS_DESCRIPTION: &str =
    "A list of 5-8 relevant technical keywords/skills extracted from the job description.";
