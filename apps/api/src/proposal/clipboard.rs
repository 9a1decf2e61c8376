//! Copy-ready text for one section of a proposal.

use std::str::FromStr;

use crate::proposal::schema::ProposalResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalSection {
    ClientSummary,
    ProposalDraft,
    SuggestedSkills,
}

impl FromStr for ProposalSection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "client-summary" => Ok(ProposalSection::ClientSummary),
            "proposal-draft" => Ok(ProposalSection::ProposalDraft),
            "suggested-skills" => Ok(ProposalSection::SuggestedSkills),
            other => Err(format!("Unknown proposal section '{other}'")),
        }
    }
}

/// Lists become `• item` lines; the draft is returned verbatim.
pub fn section_text(result: &ProposalResult, section: ProposalSection) -> String {
    match section {
        ProposalSection::ClientSummary => bullet_lines(&result.client_summary),
        ProposalSection::ProposalDraft => result.proposal_draft.clone(),
        ProposalSection::SuggestedSkills => bullet_lines(&result.suggested_skills),
    }
}

fn bullet_lines(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("• {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
