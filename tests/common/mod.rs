#![allow(dead_code)]

use fsm_freeze::{
    FieldDescriptor, FreezeConfig, FreezePolicy, FreezeRegistry, Model, PersistSession,
    Persisted, RelationRef, SessionConfig,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FakeState {
    #[default]
    New,
    Active,
    Archived,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FakeModel {
    pub state: FakeState,
    pub cannot_change_me: bool,
    pub can_change_me: bool,
    pub title: String,
    pub owner: Option<String>,
}

impl FakeModel {
    pub fn activate(&mut self) {
        assert_eq!(self.state, FakeState::New, "activate expects a new record");
        self.state = FakeState::Active;
    }

    pub fn archive(&mut self) {
        assert_eq!(self.state, FakeState::Active, "archive expects an active record");
        self.state = FakeState::Archived;
    }
}

impl Model for FakeModel {
    const TYPE_NAME: &'static str = "fake_model";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::state("state"),
        FieldDescriptor::plain("cannot_change_me"),
        FieldDescriptor::plain("can_change_me"),
        FieldDescriptor::plain("title"),
        FieldDescriptor::relation("owner"),
    ];

    fn freeze_config() -> Option<FreezeConfig> {
        Some(
            FreezeConfig::new()
                .frozen_in_states(["active", "archived"])
                .non_frozen_fields(["can_change_me"]),
        )
    }

    fn relation(&self, attr: &str) -> Option<RelationRef> {
        match attr {
            "owner" => Some(RelationRef::new(AuditNote::TYPE_NAME, self.owner.as_deref())),
            _ => None,
        }
    }
}

/// Two state-machine fields; `status` governs freezing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FakeModel2 {
    pub status: FakeState,
    pub review: FakeState,
    pub cannot_change_me: bool,
    pub can_change_me: bool,
}

impl FakeModel2 {
    pub fn activate(&mut self) {
        assert_eq!(self.status, FakeState::New, "activate expects a new record");
        self.status = FakeState::Active;
    }

    pub fn archive(&mut self) {
        assert_eq!(self.status, FakeState::Active, "archive expects an active record");
        self.status = FakeState::Archived;
    }
}

impl Model for FakeModel2 {
    const TYPE_NAME: &'static str = "fake_model2";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::state("status"),
        FieldDescriptor::state("review"),
        FieldDescriptor::plain("cannot_change_me"),
        FieldDescriptor::plain("can_change_me"),
    ];

    fn freeze_config() -> Option<FreezeConfig> {
        Some(
            FreezeConfig::new()
                .frozen_in_states(["active", "archived"])
                .state_lookup_field("status")
                .non_frozen_fields(["can_change_me"]),
        )
    }
}

/// Never freezes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditNote {
    pub text: String,
}

impl Model for AuditNote {
    const TYPE_NAME: &'static str = "audit_note";
    const FIELDS: &'static [FieldDescriptor] = &[FieldDescriptor::plain("text")];
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Company {
    pub state: FakeState,
    pub name: String,
    pub notes: String,
}

impl Model for Company {
    const TYPE_NAME: &'static str = "company";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::state("state"),
        FieldDescriptor::plain("name"),
        FieldDescriptor::plain("notes"),
    ];

    fn freeze_config() -> Option<FreezeConfig> {
        Some(
            FreezeConfig::new()
                .frozen_in_states(["active"])
                .non_frozen_fields(["notes"]),
        )
    }
}

/// Frozen whenever its company is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Department {
    pub company: Option<String>,
    pub name: String,
    pub budget: i64,
    pub notes: String,
}

impl Model for Department {
    const TYPE_NAME: &'static str = "department";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::relation("company"),
        FieldDescriptor::plain("name"),
        FieldDescriptor::plain("budget"),
        FieldDescriptor::plain("notes"),
    ];

    fn freeze_config() -> Option<FreezeConfig> {
        Some(FreezeConfig::new().delegate_to("company"))
    }

    fn relation(&self, attr: &str) -> Option<RelationRef> {
        match attr {
            "company" => Some(RelationRef::new(Company::TYPE_NAME, self.company.as_deref())),
            _ => None,
        }
    }
}

/// Reaches the company in two hops.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Employee {
    pub department: Option<String>,
    pub title: String,
}

impl Model for Employee {
    const TYPE_NAME: &'static str = "employee";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::relation("department"),
        FieldDescriptor::plain("title"),
    ];

    fn freeze_config() -> Option<FreezeConfig> {
        Some(FreezeConfig::new().delegate_to("department.company"))
    }

    fn relation(&self, attr: &str) -> Option<RelationRef> {
        match attr {
            "department" => Some(RelationRef::new(
                Department::TYPE_NAME,
                self.department.as_deref(),
            )),
            _ => None,
        }
    }
}

/// Delegates to its department, which delegates to the company in turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contractor {
    pub department: Option<String>,
    pub rate: i64,
}

impl Model for Contractor {
    const TYPE_NAME: &'static str = "contractor";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::relation("department"),
        FieldDescriptor::plain("rate"),
    ];

    fn freeze_config() -> Option<FreezeConfig> {
        Some(FreezeConfig::new().delegate_to("department"))
    }

    fn relation(&self, attr: &str) -> Option<RelationRef> {
        match attr {
            "department" => Some(RelationRef::new(
                Department::TYPE_NAME,
                self.department.as_deref(),
            )),
            _ => None,
        }
    }
}

/// Delegates to a type that never freezes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Memo {
    pub note: Option<String>,
    pub text: String,
}

impl Model for Memo {
    const TYPE_NAME: &'static str = "memo";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::relation("note"),
        FieldDescriptor::plain("text"),
    ];

    fn freeze_config() -> Option<FreezeConfig> {
        Some(FreezeConfig::new().delegate_to("note"))
    }

    fn relation(&self, attr: &str) -> Option<RelationRef> {
        match attr {
            "note" => Some(RelationRef::new(AuditNote::TYPE_NAME, self.note.as_deref())),
            _ => None,
        }
    }
}

/// Delegates to another node of its own type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleNode {
    pub peer: Option<String>,
    pub label: String,
}

impl Model for CycleNode {
    const TYPE_NAME: &'static str = "cycle_node";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::relation("peer"),
        FieldDescriptor::plain("label"),
    ];

    fn freeze_config() -> Option<FreezeConfig> {
        Some(FreezeConfig::new().delegate_to("peer"))
    }

    fn relation(&self, attr: &str) -> Option<RelationRef> {
        match attr {
            "peer" => Some(RelationRef::new(CycleNode::TYPE_NAME, self.peer.as_deref())),
            _ => None,
        }
    }
}

pub fn registry() -> FreezeRegistry {
    let mut registry = FreezeRegistry::new();
    registry
        .register::<FakeModel>()
        .and_then(|r| r.register::<FakeModel2>())
        .and_then(|r| r.register::<AuditNote>())
        .and_then(|r| r.register::<Company>())
        .and_then(|r| r.register::<Department>())
        .and_then(|r| r.register::<Employee>())
        .and_then(|r| r.register::<Contractor>())
        .and_then(|r| r.register::<Memo>())
        .and_then(|r| r.register::<CycleNode>())
        .expect("fixture models are valid");
    registry
}

pub fn session() -> PersistSession {
    PersistSession::new(FreezePolicy::new(registry()))
}

pub fn session_with_config(config: SessionConfig) -> PersistSession {
    PersistSession::with_config(FreezePolicy::new(registry()), config)
}

pub async fn active_fake(session: &PersistSession) -> Persisted<FakeModel> {
    let mut fake = Persisted::new(FakeModel::default());
    session.create(&mut fake).await.unwrap();
    fake.activate();
    session.save(&mut fake).await.unwrap();
    fake
}

pub async fn active_fake2(session: &PersistSession) -> Persisted<FakeModel2> {
    let mut fake = Persisted::new(FakeModel2::default());
    session.create(&mut fake).await.unwrap();
    fake.activate();
    session.save(&mut fake).await.unwrap();
    fake
}

pub async fn company(session: &PersistSession, state: FakeState) -> Persisted<Company> {
    let mut company = Persisted::new(Company {
        state,
        name: "Acme".to_string(),
        notes: String::new(),
    });
    session.create(&mut company).await.unwrap();
    company
}

pub async fn department(session: &PersistSession, company: &Persisted<Company>) -> Persisted<Department> {
    use fsm_freeze::PersistEntity;

    let mut department = Persisted::new(Department {
        company: Some(company.persist_id().to_string()),
        name: "R&D".to_string(),
        budget: 100,
        notes: String::new(),
    });
    session.create(&mut department).await.unwrap();
    department
}
