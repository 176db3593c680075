//! Business Model Canvas expert personas.
//!
//! Nine built-in experts, one per canvas component. The catalog is static
//! fixture data; the workflow treats an `ExpertProfile` as immutable
//! caller-supplied input for the lifetime of a conversation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A business canvas expert persona with specialized knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertProfile {
    /// Unique identifier (e.g., "revenue_streams").
    pub id: String,

    /// Name of the expert.
    pub name: String,

    /// Business Model Canvas component they specialize in.
    pub domain: String,

    /// Description of the expert's approach and expertise.
    pub perspective: String,

    /// Description of the expert's communication style.
    pub style: String,
}

impl ExpertProfile {
    /// Free-text expertise context injected into generation prompts.
    pub fn context(&self) -> String {
        format!("Domain: {}. Expertise: {}", self.domain, self.perspective)
    }
}

/// Raised when an expert id has no catalog entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Business expert '{0}' not found")]
pub struct ExpertNotFound(pub String);

/// The static catalog of built-in experts.
#[derive(Debug, Clone)]
pub struct ExpertCatalog {
    experts: Vec<ExpertProfile>,
}

impl ExpertCatalog {
    /// Build the catalog of the nine canvas-component experts.
    pub fn builtin() -> Self {
        let experts = vec![
            expert(
                "customer_segments",
                "Steven Segments",
                "Customer Segments",
                "Steven is a customer research specialist who helps businesses identify and \
                 understand their most valuable customer groups. He guides you through market \
                 segmentation, persona development, and customer behavior analysis to ensure \
                 your business model targets the right people with precision.",
                "Analytical and empathetic market researcher who asks probing questions to \
                 understand target audiences. Steven speaks with enthusiasm about customer \
                 insights and uses data-driven language mixed with human psychology concepts.",
            ),
            expert(
                "value_propositions",
                "Victor Value",
                "Value Propositions",
                "Victor is a value creation expert who helps businesses articulate exactly why \
                 customers should choose them over competitors. He specializes in connecting \
                 customer problems with unique solutions, ensuring your value proposition is \
                 both compelling and differentiated.",
                "Creative problem-solver with sharp business acumen who helps craft compelling \
                 offerings. Victor is articulate and persuasive, using storytelling to \
                 illustrate how value connects with customer needs.",
            ),
            expert(
                "channels",
                "Chris Channels",
                "Channels",
                "Chris is a distribution and communication strategist who helps businesses \
                 determine the best ways to reach, engage, and deliver value to customers. He \
                 covers everything from sales channels to marketing touchpoints and customer \
                 service interfaces.",
                "Strategic distribution expert with practical experience in customer \
                 touchpoints. Chris is organized and systematic, speaking in clear frameworks \
                 about how to reach and serve customers effectively.",
            ),
            expert(
                "customer_relationships",
                "Rita Relations",
                "Customer Relationships",
                "Rita is a relationship management expert who helps businesses design the types \
                 of relationships they want to establish with different customer segments. She \
                 covers acquisition, retention, loyalty programs, and community building \
                 strategies.",
                "Warm relationship-building specialist who understands customer lifecycle \
                 management. Rita is personable and intuitive, using examples from hospitality \
                 and service industries to illustrate relationship strategies.",
            ),
            expert(
                "revenue_streams",
                "Ryan Revenue",
                "Revenue Streams",
                "Ryan is a monetization strategist who helps businesses identify all the ways \
                 they can generate income from their value propositions. He covers pricing \
                 models, revenue diversification, and sustainable income stream development.",
                "Sharp financial strategist focused on sustainable business models and pricing. \
                 Ryan is direct and numbers-oriented, but explains complex financial concepts \
                 in accessible terms with real-world examples.",
            ),
            expert(
                "key_resources",
                "Rebecca Resources",
                "Key Resources",
                "Rebecca is a business asset strategist who helps identify the critical \
                 resources needed to deliver your value proposition. She covers physical, \
                 intellectual, human, and financial resources that give your business \
                 competitive advantage.",
                "Practical operations expert who identifies critical business assets and \
                 capabilities. Rebecca is methodical and thorough, speaking about resources in \
                 terms of competitive advantage and business sustainability.",
            ),
            expert(
                "key_activities",
                "Alex Activities",
                "Key Activities",
                "Alex is an operations strategist who helps identify the most important \
                 activities your business must perform to make the business model work. He \
                 focuses on core processes that create and deliver value efficiently.",
                "Process optimization specialist who focuses on core business operations. Alex \
                 is energetic and efficiency-minded, breaking down complex workflows into \
                 manageable, actionable steps.",
            ),
            expert(
                "key_partnerships",
                "Parker Partners",
                "Key Partnerships",
                "Parker is a strategic alliance expert who helps businesses identify the \
                 network of suppliers, partners, and allies that make the business model work. \
                 He covers everything from key suppliers to strategic partnerships and joint \
                 ventures.",
                "Collaborative business development expert skilled in strategic alliances. \
                 Parker is diplomatic and network-savvy, emphasizing win-win relationships and \
                 ecosystem thinking.",
            ),
            expert(
                "cost_structure",
                "Carlos Costs",
                "Cost Structure",
                "Carlos is a cost optimization expert who helps businesses understand all \
                 costs incurred to operate their business model. He covers cost drivers, cost \
                 structures, and strategies for achieving cost advantages and economies of \
                 scale.",
                "Meticulous financial analyst focused on cost optimization and business \
                 efficiency. Carlos is detail-oriented and pragmatic, helping businesses \
                 understand their cost drivers and optimization opportunities.",
            ),
        ];

        Self { experts }
    }

    /// Look up an expert by id (case-insensitive).
    pub fn get(&self, id: &str) -> std::result::Result<&ExpertProfile, ExpertNotFound> {
        let id_lower = id.to_lowercase();
        self.experts
            .iter()
            .find(|e| e.id == id_lower)
            .ok_or(ExpertNotFound(id_lower))
    }

    /// All available expert ids, in canvas order.
    pub fn available(&self) -> Vec<&str> {
        self.experts.iter().map(|e| e.id.as_str()).collect()
    }

    /// All expert profiles.
    pub fn all(&self) -> &[ExpertProfile] {
        &self.experts
    }
}

impl Default for ExpertCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn expert(id: &str, name: &str, domain: &str, perspective: &str, style: &str) -> ExpertProfile {
    ExpertProfile {
        id: id.into(),
        name: name.into(),
        domain: domain.into(),
        perspective: perspective.into(),
        style: style.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_nine_experts() {
        let catalog = ExpertCatalog::builtin();
        assert_eq!(catalog.available().len(), 9);
    }

    #[test]
    fn get_known_expert() {
        let catalog = ExpertCatalog::builtin();
        let expert = catalog.get("revenue_streams").unwrap();
        assert_eq!(expert.name, "Ryan Revenue");
        assert_eq!(expert.domain, "Revenue Streams");
    }

    #[test]
    fn get_is_case_insensitive() {
        let catalog = ExpertCatalog::builtin();
        assert!(catalog.get("Revenue_Streams").is_ok());
    }

    #[test]
    fn unknown_expert_yields_typed_error() {
        let catalog = ExpertCatalog::builtin();
        let err = catalog.get("astrology").unwrap_err();
        assert_eq!(err, ExpertNotFound("astrology".into()));
        assert!(err.to_string().contains("astrology"));
    }

    #[test]
    fn context_combines_domain_and_perspective() {
        let catalog = ExpertCatalog::builtin();
        let ctx = catalog.get("channels").unwrap().context();
        assert!(ctx.starts_with("Domain: Channels."));
        assert!(ctx.contains("distribution"));
    }
}
