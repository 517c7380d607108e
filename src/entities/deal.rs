//! Deal entity - a sales opportunity moving through the pipeline

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::error::QuoteError;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::quote::{LineItem, QuoteOption, QuoteRevision};

/// Pipeline stage of a deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    #[default]
    SalesLead,
    Tender,
    Proposal,
    Negotiation,
    Won,
    Lost,
    Abandoned,
}

impl DealStage {
    /// All stages in board order
    pub fn pipeline() -> &'static [DealStage] {
        &[
            DealStage::SalesLead,
            DealStage::Tender,
            DealStage::Proposal,
            DealStage::Negotiation,
            DealStage::Won,
            DealStage::Lost,
            DealStage::Abandoned,
        ]
    }

    /// Stages a deal may move to from this one
    pub fn allowed_transitions(&self) -> &'static [DealStage] {
        match self {
            DealStage::SalesLead => &[DealStage::Tender, DealStage::Abandoned],
            DealStage::Tender => &[DealStage::Proposal, DealStage::Lost, DealStage::Abandoned],
            DealStage::Proposal => &[DealStage::Negotiation, DealStage::Lost, DealStage::Abandoned],
            DealStage::Negotiation => &[DealStage::Won, DealStage::Lost, DealStage::Abandoned],
            DealStage::Won => &[],
            DealStage::Lost | DealStage::Abandoned => &[DealStage::SalesLead],
        }
    }

    pub fn can_transition_to(&self, target: DealStage) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Won, lost and abandoned deals take no new revisions
    pub fn is_closed(&self) -> bool {
        matches!(self, DealStage::Won | DealStage::Lost | DealStage::Abandoned)
    }

    /// Quotes of won and lost deals cannot be edited
    pub fn is_locked(&self) -> bool {
        matches!(self, DealStage::Won | DealStage::Lost)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DealStage::SalesLead => "Sales Lead",
            DealStage::Tender => "Tender",
            DealStage::Proposal => "Proposal",
            DealStage::Negotiation => "Negotiation",
            DealStage::Won => "Won",
            DealStage::Lost => "Lost",
            DealStage::Abandoned => "Abandoned",
        }
    }
}

impl std::fmt::Display for DealStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DealStage::SalesLead => write!(f, "sales_lead"),
            DealStage::Tender => write!(f, "tender"),
            DealStage::Proposal => write!(f, "proposal"),
            DealStage::Negotiation => write!(f, "negotiation"),
            DealStage::Won => write!(f, "won"),
            DealStage::Lost => write!(f, "lost"),
            DealStage::Abandoned => write!(f, "abandoned"),
        }
    }
}

impl std::str::FromStr for DealStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "sales_lead" | "lead" => Ok(DealStage::SalesLead),
            "tender" => Ok(DealStage::Tender),
            "proposal" => Ok(DealStage::Proposal),
            "negotiation" => Ok(DealStage::Negotiation),
            "won" => Ok(DealStage::Won),
            "lost" => Ok(DealStage::Lost),
            "abandoned" => Ok(DealStage::Abandoned),
            _ => Err(format!(
                "Invalid stage: {}. Use sales_lead, tender, proposal, negotiation, won, lost, or abandoned",
                s
            )),
        }
    }
}

/// Market segment of a deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DealType {
    #[default]
    #[serde(rename = "HVAC")]
    Hvac,
    Hydraulic,
    Hydronic,
    #[serde(rename = "Data Centres")]
    DataCentres,
    Merchant,
    Wholesaler,
    #[serde(rename = "OEM")]
    Oem,
}

impl std::fmt::Display for DealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DealType::Hvac => write!(f, "HVAC"),
            DealType::Hydraulic => write!(f, "Hydraulic"),
            DealType::Hydronic => write!(f, "Hydronic"),
            DealType::DataCentres => write!(f, "Data Centres"),
            DealType::Merchant => write!(f, "Merchant"),
            DealType::Wholesaler => write!(f, "Wholesaler"),
            DealType::Oem => write!(f, "OEM"),
        }
    }
}

impl std::str::FromStr for DealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], " ").as_str() {
            "hvac" => Ok(DealType::Hvac),
            "hydraulic" => Ok(DealType::Hydraulic),
            "hydronic" => Ok(DealType::Hydronic),
            "data centres" | "data centers" | "datacentres" => Ok(DealType::DataCentres),
            "merchant" => Ok(DealType::Merchant),
            "wholesaler" => Ok(DealType::Wholesaler),
            "oem" => Ok(DealType::Oem),
            _ => Err(format!("Invalid deal type: {}", s)),
        }
    }
}

/// Australian state or territory of the project site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum AustralianState {
    #[default]
    Nsw,
    Vic,
    Qld,
    Wa,
    Sa,
    Tas,
    Nt,
    Act,
}

impl std::fmt::Display for AustralianState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AustralianState::Nsw => "NSW",
            AustralianState::Vic => "VIC",
            AustralianState::Qld => "QLD",
            AustralianState::Wa => "WA",
            AustralianState::Sa => "SA",
            AustralianState::Tas => "TAS",
            AustralianState::Nt => "NT",
            AustralianState::Act => "ACT",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AustralianState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NSW" => Ok(AustralianState::Nsw),
            "VIC" => Ok(AustralianState::Vic),
            "QLD" => Ok(AustralianState::Qld),
            "WA" => Ok(AustralianState::Wa),
            "SA" => Ok(AustralianState::Sa),
            "TAS" => Ok(AustralianState::Tas),
            "NT" => Ok(AustralianState::Nt),
            "ACT" => Ok(AustralianState::Act),
            _ => Err(format!("Invalid state: {}", s)),
        }
    }
}

/// Person attached to a deal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// How a new revision is started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionSource {
    /// One empty "Main Option"
    Blank,
    /// Copy of the recipient's latest revision
    CopyLast,
    /// Copy of any revision in the deal
    Clone(EntityId),
}

/// Deal entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    /// Unique identifier (DEAL-xxx)
    pub id: EntityId,

    /// Project name, unique across deals ignoring case
    pub project_name: String,

    #[serde(default)]
    pub deal_type: DealType,

    #[serde(default)]
    pub state: AustralianState,

    #[serde(default)]
    pub stage: DealStage,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Companies quoted on this deal
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub companies: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contacts: Vec<Contact>,

    #[serde(default)]
    pub revisions: Vec<QuoteRevision>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created: DateTime<Utc>,

    pub author: String,
}

impl Deal {
    pub fn new(project_name: impl Into<String>, deal_type: DealType, state: AustralianState, author: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Deal),
            project_name: project_name.into(),
            deal_type,
            state,
            stage: DealStage::SalesLead,
            owner: None,
            companies: Vec::new(),
            contacts: Vec::new(),
            revisions: Vec::new(),
            notes: None,
            created: Utc::now(),
            author: author.into(),
        }
    }

    /// Most recently created revision
    pub fn latest_revision(&self) -> Option<&QuoteRevision> {
        self.revisions.iter().max_by_key(|r| r.created)
    }

    /// Highest option grand total in the most recent revision
    pub fn value(&self) -> Decimal {
        self.latest_revision()
            .map(QuoteRevision::best_grand_total)
            .unwrap_or(Decimal::ZERO)
    }

    /// Fail when quotes of this deal may not change
    pub fn ensure_editable(&self) -> Result<(), QuoteError> {
        if self.stage.is_locked() {
            return Err(QuoteError::PersistenceRejected(format!(
                "deal '{}' is {} and its quotes are locked",
                self.project_name,
                self.stage.label()
            )));
        }
        Ok(())
    }

    /// Move along the pipeline; `force` skips the transition table
    pub fn move_to(&mut self, target: DealStage, force: bool) -> Result<DealStage, QuoteError> {
        let previous = self.stage;
        if previous == target {
            return Ok(previous);
        }
        if !force && !previous.can_transition_to(target) {
            return Err(QuoteError::PersistenceRejected(format!(
                "cannot move from {} to {}",
                previous.label(),
                target.label()
            )));
        }
        self.stage = target;
        Ok(previous)
    }

    pub fn add_company(&mut self, company: &str) {
        if !self.companies.iter().any(|c| c.eq_ignore_ascii_case(company)) {
            self.companies.push(company.to_string());
        }
    }

    pub fn next_revision_number(&self, recipient: &str) -> u32 {
        self.revisions
            .iter()
            .filter(|r| r.recipient.eq_ignore_ascii_case(recipient))
            .map(|r| r.revision)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Start a new revision for a recipient
    pub fn new_revision(&mut self, recipient: &str, source: RevisionSource) -> Result<&QuoteRevision, QuoteError> {
        if self.stage.is_closed() {
            return Err(QuoteError::PersistenceRejected(format!(
                "deal '{}' is {}; reopen it before adding revisions",
                self.project_name,
                self.stage.label()
            )));
        }

        let number = self.next_revision_number(recipient);
        let revision = match source {
            RevisionSource::Blank => QuoteRevision::blank(recipient, number),
            RevisionSource::CopyLast => {
                let last = self
                    .revisions
                    .iter()
                    .filter(|r| r.recipient.eq_ignore_ascii_case(recipient))
                    .max_by_key(|r| r.revision)
                    .ok_or_else(|| QuoteError::not_found("revision for recipient", recipient))?;
                QuoteRevision::cloned_from(last, recipient, number)
            }
            RevisionSource::Clone(id) => {
                let source = self
                    .revision(&id)
                    .ok_or_else(|| QuoteError::not_found("revision", id.to_string()))?;
                QuoteRevision::cloned_from(source, recipient, number)
            }
        };

        self.add_company(recipient);
        self.revisions.push(revision);
        let index = self.revisions.len() - 1;
        Ok(&self.revisions[index])
    }

    /// Delete a revision unless it is the last one or the deal is closed
    pub fn delete_revision(&mut self, id: &EntityId) -> Result<QuoteRevision, QuoteError> {
        let index = self
            .revisions
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| QuoteError::not_found("revision", id.to_string()))?;
        if self.stage.is_closed() {
            return Err(QuoteError::PersistenceRejected(format!(
                "deal '{}' is {}; its revisions cannot be deleted",
                self.project_name,
                self.stage.label()
            )));
        }
        if self.revisions.len() == 1 {
            return Err(QuoteError::PersistenceRejected(
                "cannot delete the only revision of a deal".to_string(),
            ));
        }
        Ok(self.revisions.remove(index))
    }

    /// Add an option to a revision
    pub fn add_option(&mut self, revision: &EntityId, option: QuoteOption) -> Result<EntityId, QuoteError> {
        self.ensure_editable()?;
        let target = self
            .revision_mut(revision)
            .ok_or_else(|| QuoteError::not_found("revision", revision.to_string()))?;
        let id = option.id.clone();
        target.options.push(option);
        Ok(id)
    }

    /// Remove an option unless it is the only one in its revision
    pub fn delete_option(&mut self, option: &EntityId) -> Result<QuoteOption, QuoteError> {
        self.ensure_editable()?;
        let revision = self
            .revisions
            .iter_mut()
            .find(|r| r.options.iter().any(|o| &o.id == option))
            .ok_or_else(|| QuoteError::not_found("option", option.to_string()))?;
        if revision.options.len() == 1 {
            return Err(QuoteError::PersistenceRejected(
                "cannot delete the only option of a revision".to_string(),
            ));
        }
        let index = revision
            .options
            .iter()
            .position(|o| &o.id == option)
            .ok_or_else(|| QuoteError::not_found("option", option.to_string()))?;
        Ok(revision.options.remove(index))
    }

    pub fn revision(&self, id: &EntityId) -> Option<&QuoteRevision> {
        self.revisions.iter().find(|r| &r.id == id)
    }

    pub fn revision_mut(&mut self, id: &EntityId) -> Option<&mut QuoteRevision> {
        self.revisions.iter_mut().find(|r| &r.id == id)
    }

    pub fn options(&self) -> impl Iterator<Item = &QuoteOption> {
        self.revisions.iter().flat_map(|r| r.options.iter())
    }

    pub fn option(&self, id: &EntityId) -> Option<&QuoteOption> {
        self.options().find(|o| &o.id == id)
    }

    pub fn option_mut(&mut self, id: &EntityId) -> Option<&mut QuoteOption> {
        self.revisions
            .iter_mut()
            .flat_map(|r| r.options.iter_mut())
            .find(|o| &o.id == id)
    }

    /// Revision containing an option
    pub fn revision_of_option(&self, option: &EntityId) -> Option<&QuoteRevision> {
        self.revisions
            .iter()
            .find(|r| r.options.iter().any(|o| &o.id == option))
    }

    /// Option containing an item
    pub fn option_of_item(&self, item: &EntityId) -> Option<&QuoteOption> {
        self.options().find(|o| o.item(item).is_some())
    }

    pub fn item(&self, id: &EntityId) -> Option<&LineItem> {
        self.options().find_map(|o| o.item(id))
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        match id.prefix() {
            EntityPrefix::Deal => &self.id == id,
            EntityPrefix::Rev => self.revision(id).is_some(),
            EntityPrefix::Opt => self.option(id).is_some(),
            EntityPrefix::Item => self.item(id).is_some(),
        }
    }
}

/// One column of the deal board
#[derive(Debug, Clone)]
pub struct BoardColumn<'a> {
    pub stage: DealStage,
    pub deals: Vec<&'a Deal>,
    pub total: Decimal,
    pub average: Decimal,
}

impl BoardColumn<'_> {
    pub fn count(&self) -> usize {
        self.deals.len()
    }
}

/// Group deals by stage in pipeline order with value statistics
pub fn board(deals: &[Deal]) -> Vec<BoardColumn<'_>> {
    DealStage::pipeline()
        .iter()
        .map(|&stage| {
            let in_stage: Vec<&Deal> = deals.iter().filter(|d| d.stage == stage).collect();
            let total = in_stage
                .iter()
                .fold(Decimal::ZERO, |acc, d| acc.saturating_add(d.value()));
            let average = if in_stage.is_empty() {
                Decimal::ZERO
            } else {
                total / Decimal::from(in_stage.len())
            };
            BoardColumn {
                stage,
                deals: in_stage,
                total,
                average,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn deal() -> Deal {
        Deal::new("Hospital Plant Room", DealType::Hvac, AustralianState::Nsw, "sam")
    }

    #[test]
    fn test_transition_table() {
        use DealStage::*;
        assert!(SalesLead.can_transition_to(Tender));
        assert!(SalesLead.can_transition_to(Abandoned));
        assert!(!SalesLead.can_transition_to(Won));
        assert!(!SalesLead.can_transition_to(Lost));
        assert!(Negotiation.can_transition_to(Won));
        assert!(Lost.can_transition_to(SalesLead));
        assert!(Abandoned.can_transition_to(SalesLead));
        assert!(!Lost.can_transition_to(Tender));
        assert!(Won.allowed_transitions().is_empty());
    }

    #[test]
    fn test_move_to_validates_unless_forced() {
        let mut d = deal();
        assert!(d.move_to(DealStage::Won, false).is_err());
        assert_eq!(d.stage, DealStage::SalesLead);
        assert_eq!(d.move_to(DealStage::Won, true).unwrap(), DealStage::SalesLead);
        assert_eq!(d.stage, DealStage::Won);
    }

    #[test]
    fn test_revision_numbers_per_recipient() {
        let mut d = deal();
        assert_eq!(d.new_revision("Acme", RevisionSource::Blank).unwrap().revision, 1);
        assert_eq!(d.new_revision("Acme", RevisionSource::Blank).unwrap().revision, 2);
        assert_eq!(d.new_revision("Beta Air", RevisionSource::Blank).unwrap().revision, 1);
        assert_eq!(d.companies, vec!["Acme".to_string(), "Beta Air".to_string()]);
    }

    #[test]
    fn test_copy_last_deep_copies() {
        let mut d = deal();
        let first = d.new_revision("Acme", RevisionSource::Blank).unwrap().clone();
        let option_id = first.options[0].id.clone();
        d.option_mut(&option_id)
            .unwrap()
            .push_item(LineItem::custom("Labour", 2, dec!(80)));

        let copy = d.new_revision("Acme", RevisionSource::CopyLast).unwrap().clone();
        assert_eq!(copy.revision, 2);
        assert_ne!(copy.options[0].id, option_id);
        assert_eq!(copy.options[0].items.len(), 1);
        assert_ne!(copy.options[0].items[0].id, d.option(&option_id).unwrap().items[0].id);

        assert!(d.new_revision("Nobody", RevisionSource::CopyLast).is_err());
    }

    #[test]
    fn test_closed_deal_guards() {
        let mut d = deal();
        let rev = d.new_revision("Acme", RevisionSource::Blank).unwrap().id.clone();
        d.new_revision("Acme", RevisionSource::Blank).unwrap();

        d.move_to(DealStage::Abandoned, false).unwrap();
        assert!(d.ensure_editable().is_ok());
        assert!(d.new_revision("Acme", RevisionSource::Blank).is_err());
        assert!(d.delete_revision(&rev).is_err());

        d.move_to(DealStage::SalesLead, false).unwrap();
        d.delete_revision(&rev).unwrap();

        let only = d.revisions[0].id.clone();
        let err = d.delete_revision(&only).unwrap_err();
        assert!(matches!(err, QuoteError::PersistenceRejected(_)));

        d.move_to(DealStage::Lost, true).unwrap();
        assert!(d.ensure_editable().is_err());
    }

    #[test]
    fn test_value_uses_latest_revision_best_option() {
        let mut d = deal();
        assert_eq!(d.value(), Decimal::ZERO);

        let rev = d.new_revision("Acme", RevisionSource::Blank).unwrap().id.clone();
        let revision = d.revision_mut(&rev).unwrap();
        revision.options[0].push_item(LineItem::custom("Pump set", 1, dec!(1000)));
        let mut alt = QuoteOption::new("Alternate");
        alt.push_item(LineItem::custom("Pump set", 1, dec!(1500)));
        alt.freight_charge = dec!(100);
        revision.options.push(alt);

        assert_eq!(d.value(), dec!(1600));
    }

    #[test]
    fn test_board_statistics() {
        let mut won = deal();
        won.stage = DealStage::Won;
        won.revisions.push(QuoteRevision::blank("Acme", 1));
        won.revisions[0].options[0].push_item(LineItem::custom("Pumps", 2, dec!(500)));

        let deals = vec![deal(), deal(), won];
        let columns = board(&deals);

        assert_eq!(columns.len(), DealStage::pipeline().len());
        assert_eq!(columns[0].stage, DealStage::SalesLead);
        assert_eq!(columns[0].count(), 2);
        let won_column = columns.iter().find(|c| c.stage == DealStage::Won).unwrap();
        assert_eq!(won_column.total, dec!(1000));
        assert_eq!(won_column.average, dec!(1000));
    }

    #[test]
    fn test_option_add_and_delete() {
        let mut d = deal();
        let rev = d.new_revision("Acme", RevisionSource::Blank).unwrap().id.clone();
        let main = d.revisions[0].options[0].id.clone();

        let err = d.delete_option(&main).unwrap_err();
        assert!(matches!(err, QuoteError::PersistenceRejected(_)));

        let alt = d.add_option(&rev, QuoteOption::new("Duty/standby")).unwrap();
        assert_eq!(d.revisions[0].options.len(), 2);
        assert_eq!(d.delete_option(&main).unwrap().id, main);
        assert_eq!(d.revisions[0].options[0].id, alt);

        d.move_to(DealStage::Won, true).unwrap();
        assert!(d.add_option(&rev, QuoteOption::new("Late")).is_err());
    }

    #[test]
    fn test_stage_and_type_parsing() {
        assert_eq!("sales-lead".parse::<DealStage>().unwrap(), DealStage::SalesLead);
        assert_eq!("Data Centres".parse::<DealType>().unwrap(), DealType::DataCentres);
        assert_eq!("vic".parse::<AustralianState>().unwrap(), AustralianState::Vic);
        assert!("mars".parse::<AustralianState>().is_err());
    }
}
