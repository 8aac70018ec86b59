// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const ROSTER: &str = r#"
teams:
  - id: alpha
    orchestrator: lead-1
    dispatch:
      maxConcurrent: 2
      minIntervalMs: 500
    murmur:
      triggers:
        - type: queueEmpty
        - type: completionBatch
          threshold: 5
agents:
  - id: lead-1
    team: alpha
    roles: [orchestrator]
  - id: dev-1
    team: alpha
    roles: [developer]
    reportsTo: lead-1
  - id: qa-1
    team: alpha
    roles: [reviewer, researcher]
    policies:
      context:
        target: 10000
        warn: 20000
        critical: 40000
"#;

#[test]
fn parses_roster() {
    let chart = OrgChart::parse(ROSTER).unwrap();
    assert_eq!(chart.teams.len(), 1);
    assert_eq!(chart.agents.len(), 3);

    let team = chart.team("alpha").unwrap();
    assert_eq!(team.dispatch.as_ref().unwrap().max_concurrent, Some(2));
    assert_eq!(
        team.murmur.as_ref().unwrap().triggers[1],
        MurmurTrigger::CompletionBatch { threshold: 5 }
    );
}

#[test]
fn agents_default_to_active() {
    let chart = OrgChart::parse(ROSTER).unwrap();
    assert!(chart.agent("dev-1").unwrap().active);
}

#[test]
fn role_and_team_queries_skip_inactive() {
    let mut chart = OrgChart::parse(ROSTER).unwrap();
    chart.agents[1].active = false;

    let devs: Vec<_> = chart.agents_with_role("developer").collect();
    assert!(devs.is_empty());

    let members: Vec<_> = chart.team_members("alpha").map(|a| a.id.as_str()).collect();
    assert_eq!(members, vec!["lead-1", "qa-1"]);
}

#[test]
fn missing_file_is_empty_roster() {
    let dir = tempfile::tempdir().unwrap();
    let chart = OrgChart::load(dir.path()).unwrap();
    assert!(chart.teams.is_empty());
    assert!(chart.agents.is_empty());
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let chart = OrgChart::parse(ROSTER).unwrap();
    chart.save(dir.path()).unwrap();
    let loaded = OrgChart::load(dir.path()).unwrap();
    similar_asserts::assert_eq!(loaded, chart);
}

#[test]
fn lint_flags_circular_reports_to() {
    let chart = OrgChart::parse(
        r#"
agents:
  - id: a
    reportsTo: b
  - id: b
    reportsTo: a
"#,
    );
    // parse() promotes error-severity lints to a load failure
    assert!(chart.is_err());
}

#[test]
fn lint_flags_dangling_team_and_orchestrator() {
    let chart = OrgChart {
        teams: vec![Team {
            id: aof_core::TeamId::new("alpha"),
            orchestrator: Some(aof_core::AgentId::new("ghost")),
            dispatch: None,
            murmur: None,
        }],
        agents: vec![Agent {
            id: aof_core::AgentId::new("dev-1"),
            team: Some(aof_core::TeamId::new("beta")),
            roles: vec![],
            reports_to: None,
            active: true,
            policies: None,
        }],
    };
    let rules: Vec<_> = chart.lint().into_iter().map(|i| i.rule).collect();
    assert!(rules.contains(&"dangling-orchestrator".to_string()));
    assert!(rules.contains(&"dangling-team".to_string()));
}

#[test]
fn lint_flags_inverted_context_budget() {
    let chart = OrgChart {
        teams: vec![],
        agents: vec![Agent {
            id: aof_core::AgentId::new("dev-1"),
            team: None,
            roles: vec![],
            reports_to: None,
            active: true,
            policies: Some(AgentPolicies {
                context: Some(ContextBudget {
                    target: 40000,
                    warn: 20000,
                    critical: 10000,
                }),
            }),
        }],
    };
    let issues = chart.lint();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].rule, "inverted-context-budget");
    assert_eq!(issues[0].severity, Severity::Error);
}

#[test]
fn lint_flags_murmur_without_orchestrator() {
    let chart = OrgChart {
        teams: vec![Team {
            id: aof_core::TeamId::new("alpha"),
            orchestrator: None,
            dispatch: None,
            murmur: Some(MurmurConfig {
                triggers: vec![MurmurTrigger::QueueEmpty],
                context_includes: vec![],
            }),
        }],
        agents: vec![],
    };
    let rules: Vec<_> = chart.lint().into_iter().map(|i| i.rule).collect();
    assert!(rules.contains(&"murmur-without-orchestrator".to_string()));
}

#[test]
fn lint_warns_on_zero_threshold() {
    let chart = OrgChart {
        teams: vec![Team {
            id: aof_core::TeamId::new("alpha"),
            orchestrator: Some(aof_core::AgentId::new("lead")),
            dispatch: None,
            murmur: Some(MurmurConfig {
                triggers: vec![MurmurTrigger::CompletionBatch { threshold: 0 }],
                context_includes: vec![],
            }),
        }],
        agents: vec![Agent {
            id: aof_core::AgentId::new("lead"),
            team: Some(aof_core::TeamId::new("alpha")),
            roles: vec![],
            reports_to: None,
            active: true,
            policies: None,
        }],
    };
    let issues = chart.lint();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Warning);
}

#[test]
fn duplicate_agents_rejected() {
    let err = OrgChart::parse("agents:\n  - id: a\n  - id: a\n").unwrap_err();
    assert!(err.to_string().contains("more than once"));
}
