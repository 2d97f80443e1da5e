//! Arena-backed document model for parsed specifications.
//!
//! Specifications, scenarios and steps are owned by a single [`Suite`] and
//! refer to each other through stable ids. Error maps key on these ids, so two
//! steps sharing the same text still occupy distinct positions.

/// Position of a [`Specification`] inside a [`Suite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecId(pub usize);

/// Position of a [`Scenario`] inside a [`Suite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScenarioId(pub usize);

/// Position of a [`Step`] inside a [`Suite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub text: String,
    pub line_no: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tags {
    pub values: Vec<String>,
    pub line_no: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub line_no: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
    pub line_no: usize,
}

/// Marker separating context steps from teardown steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TearDown {
    pub text: String,
    pub line_no: usize,
}

/// Ordered content of a specification or scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Comment(Comment),
    Tags(Tags),
    Table(Table),
    Step(StepId),
    TearDown(TearDown),
    Scenario(ScenarioId),
}

/// One executable line: either a literal step or a concept invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub id: StepId,
    /// Normalized text used to match implementations (`login as {}`).
    pub value: String,
    /// Text as written in the source file.
    pub line_text: String,
    pub line_no: usize,
    pub args: Vec<String>,
    pub is_concept: bool,
    /// Body of a concept step, in order.
    pub concept_steps: Vec<StepId>,
    /// Concept step that expanded into this step.
    pub parent: Option<StepId>,
}

impl Step {
    pub fn param_count(&self) -> usize {
        self.args.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub id: ScenarioId,
    pub spec: SpecId,
    pub heading: Heading,
    pub steps: Vec<StepId>,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specification {
    pub id: SpecId,
    pub file_name: String,
    pub heading: Heading,
    pub contexts: Vec<StepId>,
    pub scenarios: Vec<ScenarioId>,
    pub tear_down_steps: Vec<StepId>,
    pub items: Vec<Item>,
}

/// Owner of every node of a parsed project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suite {
    specs: Vec<Specification>,
    scenarios: Vec<Scenario>,
    steps: Vec<Step>,
}

impl Suite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spec(&self, id: SpecId) -> &Specification {
        &self.specs[id.0]
    }

    pub fn scenario(&self, id: ScenarioId) -> &Scenario {
        &self.scenarios[id.0]
    }

    pub fn step(&self, id: StepId) -> &Step {
        &self.steps[id.0]
    }

    pub fn specs(&self) -> &[Specification] {
        &self.specs
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn add_spec(&mut self, file_name: impl Into<String>, heading: Heading) -> SpecId {
        let id = SpecId(self.specs.len());
        self.specs.push(Specification {
            id,
            file_name: file_name.into(),
            heading,
            contexts: Vec::new(),
            scenarios: Vec::new(),
            tear_down_steps: Vec::new(),
            items: Vec::new(),
        });
        id
    }

    /// Create a literal step that is not yet attached to any container.
    pub fn new_step(
        &mut self,
        value: impl Into<String>,
        line_text: impl Into<String>,
        line_no: usize,
        args: Vec<String>,
    ) -> StepId {
        let id = StepId(self.steps.len());
        self.steps.push(Step {
            id,
            value: value.into(),
            line_text: line_text.into(),
            line_no,
            args,
            is_concept: false,
            concept_steps: Vec::new(),
            parent: None,
        });
        id
    }

    /// Create a concept invocation whose body is `body`.
    ///
    /// Body steps must already exist, which keeps expansion acyclic. Each body
    /// step gets this step as its parent.
    pub fn new_concept_step(
        &mut self,
        value: impl Into<String>,
        line_text: impl Into<String>,
        line_no: usize,
        args: Vec<String>,
        body: Vec<StepId>,
    ) -> StepId {
        let id = self.new_step(value, line_text, line_no, args);
        for child in &body {
            self.steps[child.0].parent = Some(id);
        }
        let step = &mut self.steps[id.0];
        step.is_concept = true;
        step.concept_steps = body;
        id
    }

    /// Attach a spec-level step. Steps after a teardown marker are teardown steps.
    pub fn push_context_step(&mut self, spec: SpecId, step: StepId) {
        let spec = &mut self.specs[spec.0];
        if spec.items.iter().any(|item| matches!(item, Item::TearDown(_))) {
            spec.tear_down_steps.push(step);
        } else {
            spec.contexts.push(step);
        }
        spec.items.push(Item::Step(step));
    }

    pub fn add_scenario(&mut self, spec: SpecId, heading: Heading) -> ScenarioId {
        let id = ScenarioId(self.scenarios.len());
        self.scenarios.push(Scenario {
            id,
            spec,
            heading,
            steps: Vec::new(),
            items: Vec::new(),
        });
        let spec = &mut self.specs[spec.0];
        spec.scenarios.push(id);
        spec.items.push(Item::Scenario(id));
        id
    }

    pub fn push_scenario_step(&mut self, scenario: ScenarioId, step: StepId) {
        let scenario = &mut self.scenarios[scenario.0];
        scenario.steps.push(step);
        scenario.items.push(Item::Step(step));
    }

    /// Attach a non-step item (comment, tags, table, teardown marker) to a spec.
    pub fn push_spec_item(&mut self, spec: SpecId, item: Item) {
        self.specs[spec.0].items.push(item);
    }

    /// Attach a non-step item (comment, tags) to a scenario.
    pub fn push_scenario_item(&mut self, scenario: ScenarioId, item: Item) {
        self.scenarios[scenario.0].items.push(item);
    }
}
