use std::collections::{BTreeMap, BTreeSet};

use super::*;
use crate::build::build_module;
use crate::dom::{Instruction, InstructionKind, RequestMode, Scenario};
use crate::source::ByteRange;
use crate::syntax::parser::parse_module;

fn build(source: &str) -> Dom {
    let (module, messages) = parse_module(source);
    assert_eq!(messages, [], "unexpected parse messages");
    let mut dom = Dom::new();
    build_module(&mut dom, &module, source).unwrap();
    dom
}

fn compile_for(source: &str, target: &str) -> Result<Dom, PassError> {
    let mut dom = build(source);
    let options = Options {
        target_version: target.parse().unwrap(),
        ..Options::default()
    };
    run(&mut dom, &options)?;
    Ok(dom)
}

fn compile(source: &str) -> Dom {
    compile_for(source, "latest").unwrap()
}

fn flatten(instructions: &[Instruction]) -> Vec<&Instruction> {
    let mut out = Vec::new();
    for instruction in instructions {
        out.push(instruction);
        out.extend(flatten(instruction.children()));
    }
    out
}

fn receive_state(instruction: &Instruction) -> (Option<u32>, bool) {
    match instruction.kind {
        InstructionKind::Receive { next, skip, .. } => (next, skip),
        ref kind => panic!("expected a receive, found {kind:?}"),
    }
}

fn declared_names(scenario: &Scenario) -> Vec<&str> {
    scenario
        .children
        .iter()
        .map_while(|child| match &child.kind {
            InstructionKind::VarDeclaration { variable } => Some(variable.name.as_str()),
            _ => None,
        })
        .collect()
}

const VERSIONED: &str = "
    scenario X() version 1.2.3 {}
    scenario X() version 1.1.0 {}
";

#[test]
fn version_resolution() {
    let version_of = |target| {
        let dom = compile_for(VERSIONED, target).unwrap();
        assert!(dom.pending_scenario_versions.is_empty());
        dom.scenarios.get("X").map(|scenario| scenario.version.to_string())
    };

    assert_eq!(version_of("1.2.3").as_deref(), Some("1.2.3"));
    assert_eq!(version_of("1.2.0").as_deref(), Some("1.1.0"));
    assert_eq!(version_of("1.0.0"), None);
    assert_eq!(version_of("latest").as_deref(), Some("1.2.3"));
}

#[test]
fn latest_scenarios_need_a_latest_target() {
    let source = "scenario X() version latest {} scenario X() version 2.0.0 {}";

    let dom = compile_for(source, "latest").unwrap();
    assert_eq!(dom.scenarios["X"].version, Version::Latest);

    let dom = compile_for(source, "9.9.9").unwrap();
    assert_eq!(dom.scenarios["X"].version.to_string(), "2.0.0");
}

#[test]
fn sub_scenarios_resolve_separately() {
    let dom = compile_for(
        "scenario Helper(x: string) version 1.0.0 {}
         scenario Helper(x: string) version 2.0.0 {}
         scenario Main() version 1.0.0 {}",
        "1.5.0",
    )
    .unwrap();

    assert_eq!(dom.sub_scenarios["Helper"].version.to_string(), "1.0.0");
    assert!(dom.scenarios.contains_key("Main"));
    assert!(dom.pending_sub_scenario_versions.is_empty());
}

#[test]
fn ids_are_depth_first_per_scenario() {
    let dom = compile(
        "scenario A() version 1.0.0 {
            gnmi := gNMI.Subscribe
            ZeroOrMore {
                gnmi >> SubscribeResponse { }
                AnyOrder { gnmi >> SubscribeResponse { } }
            }
            close gnmi
        }
        scenario B() version 1.0.0 {
            execute Ping()
        }",
    );

    let ids = flatten(&dom.scenarios["A"].children)
        .iter()
        .map(|instruction| instruction.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, (0..6).map(Some).collect::<Vec<_>>());
    assert_eq!(dom.scenarios["B"].children[0].id, Some(0));
}

#[test]
fn back_to_back_receives() {
    let dom = compile(
        "scenario S() version 1.0.0 {
            gnmi := gNMI.Subscribe
            ZeroOrMore {
                gnmi >> SubscribeResponse { update { } }
                gnmi >> SubscribeResponse { update { } }
            }
            gnmi >> SubscribeResponse { sync_response: true }
            close gnmi
        }",
    );
    let children = &dom.scenarios["S"].children;
    let group = &children[1];
    let follower = &children[2];

    assert_eq!(receive_state(&group.children()[0]), (None, false));
    assert_eq!(receive_state(&group.children()[1]), (follower.id, false));
    assert_eq!(receive_state(follower), (None, true));
}

#[test]
fn back_to_back_needs_a_loop_and_a_matching_channel() {
    let dom = compile(
        "scenario S() version 1.0.0 {
            gnmi := gNMI.Subscribe
            ctl := ctrl.Execute
            AnyOrder { gnmi >> SubscribeResponse { } }
            gnmi >> SubscribeResponse { }
            AtLeastOnce { ctl >> ExecuteResponse { } }
            gnmi >> SubscribeResponse { }
            close gnmi
            close ctl
        }",
    );
    let children = &dom.scenarios["S"].children;

    assert_eq!(receive_state(&children[2].children()[0]), (None, false));
    assert_eq!(receive_state(&children[3]), (None, false));
    assert_eq!(receive_state(&children[4].children()[0]), (None, false));
    assert_eq!(receive_state(&children[5]), (None, false));
}

#[test]
fn back_to_back_in_nested_groups() {
    let dom = compile(
        "scenario S() version 1.0.0 {
            gnmi := gNMI.Subscribe
            AtLeastOnce {
                ZeroOrMore { gnmi >> SubscribeResponse { } }
                gnmi >> SubscribeResponse { }
            }
            gnmi >> SubscribeResponse { }
            close gnmi
        }",
    );
    let children = &dom.scenarios["S"].children;
    let outer = &children[1];
    let inner = &outer.children()[0];
    let inner_follower = &outer.children()[1];

    assert_eq!(receive_state(&inner.children()[0]), (inner_follower.id, false));
    // the inner follower is already linked, so the outer loop has no candidate
    assert_eq!(receive_state(inner_follower), (None, true));
    assert_eq!(receive_state(&children[2]), (None, false));
}

#[test]
fn any_order_partition() {
    let dom = compile(
        "scenario S() version 1.0.0 {
            gnmi := gNMI.Subscribe
            ctrl := ctrl.Execute
            gnmi << SubscribeRequest { }
            AnyOrder {
                gnmi >> SubscribeResponse { }
                gnmi >> SubscribeResponse { }
                ctrl >> ExecuteResponse { }
            }
            close gnmi
            close ctrl
        }",
    );
    let group = &dom.scenarios["S"].children[3];
    let ids = group
        .children()
        .iter()
        .map(|child| child.id.unwrap())
        .collect::<Vec<_>>();

    match &group.kind {
        InstructionKind::AnyOrder {
            children_per_channel,
            ..
        } => {
            let expected = BTreeMap::from([
                ("ctrl".to_owned(), vec![ids[2]]),
                ("gnmi".to_owned(), vec![ids[0], ids[1]]),
            ]);
            assert_eq!(children_per_channel, &expected);
        }
        kind => panic!("unexpected instruction {kind:?}"),
    }
}

#[test]
fn any_order_without_receives_is_empty() {
    let dom = compile("scenario S() version 1.0.0 { AnyOrder { execute Ping() } }");
    assert!(matches!(
        &dom.scenarios["S"].children[0].kind,
        InstructionKind::AnyOrder { children_per_channel, .. } if children_per_channel.is_empty()
    ));
}

const SUBSCRIBE_ONCE: &str = "
    scenario test() version 1.0.0 {
        gnmi := gNMI.Subscribe
        gnmi << SubscribeRequest {
            subscribe { mode: ONCE subscription [ { path: /interface[name=*] } ] }
        }
        close gnmi
    }
";

#[test]
fn coverage_subscribe_once() {
    let dom = compile(SUBSCRIBE_ONCE);

    assert_eq!(dom.covered_paths.len(), 1);
    let covered = &dom.covered_paths[r#"/interface[name="*"]"#];
    assert_eq!(covered.path, r#"/interface[name="*"]"#);
    assert_eq!(
        covered.scenarios,
        BTreeMap::from([(RequestMode::SubscribeOnce, BTreeSet::from(["test".to_owned()]))]),
    );
}

#[test]
fn coverage_accumulates_across_scenarios() {
    let source = format!("{SUBSCRIBE_ONCE}{}", SUBSCRIBE_ONCE.replace("test()", "again()"));
    let dom = compile(&source);

    assert_eq!(dom.covered_paths.len(), 1);
    let names = &dom.covered_paths[r#"/interface[name="*"]"#].scenarios[&RequestMode::SubscribeOnce];
    assert_eq!(names.iter().collect::<Vec<_>>(), ["again", "test"]);
}

#[test]
fn coverage_streaming_modes() {
    let dom = compile(
        "scenario stream() version 1.0.0 {
            gnmi := gNMI.Subscribe
            gnmi << SubscribeRequest {
                subscribe {
                    mode: STREAM
                    subscription [
                        { path: /a mode: ON_CHANGE }
                        { path: /b mode: SAMPLE }
                        { path: /c mode: TARGET_DEFINED }
                        { path: /d mode: SOMETHING_ELSE }
                    ]
                }
            }
            close gnmi
        }",
    );
    let modes = dom
        .covered_paths
        .values()
        .map(|covered| {
            let modes = covered.scenarios.keys().copied().collect::<Vec<_>>();
            (covered.path.as_str(), modes)
        })
        .collect::<Vec<_>>();

    assert_eq!(
        modes,
        [
            ("/a", vec![RequestMode::SubscribeStreamOnChange]),
            ("/b", vec![RequestMode::SubscribeStreamSample]),
            ("/c", vec![RequestMode::SubscribeStreamTargetDefined]),
            ("/d", vec![RequestMode::Other]),
        ],
    );
}

#[test]
fn coverage_missing_mode_or_path() {
    let error = compile_for(
        "scenario stream() version 1.0.0 {
            gnmi := gNMI.Subscribe
            gnmi << SubscribeRequest {
                subscribe { mode: STREAM subscription [ { path: /a } ] }
            }
            close gnmi
        }",
        "latest",
    )
    .unwrap_err();

    assert_eq!(
        error,
        PassError::MissingModeOrPath {
            scenario: "stream".to_owned(),
            id: Some(1),
            range: error.range(),
        },
    );
    assert_eq!(
        error.to_string(),
        "scenario 'stream', instruction 1: subscription is missing a mode or path field",
    );
}

#[test]
fn coverage_of_calls_and_responses() {
    let dom = compile(
        "scenario calls() version 1.0.0 {
            GetRequest { path: /system/state } >> { OK, GetResponse { notification { update { path: /system/state } } } }
            SetRequest { update { path: /system/config } } >> { ERROR }
            CapabilityRequest { } >> { OK, CapabilityResponse { } }
        }",
    );
    let modes = |path: &str| {
        dom.covered_paths[path]
            .scenarios
            .keys()
            .copied()
            .collect::<Vec<_>>()
    };

    assert_eq!(modes("/system/state"), [RequestMode::Get, RequestMode::Response]);
    assert_eq!(modes("/system/config"), [RequestMode::Set]);
    assert_eq!(dom.covered_paths.len(), 2);
}

#[test]
fn declarations_are_hoisted_once() {
    let dom = compile(
        "scenario S() version 1.0.0 {
            gnmi := gNMI.Subscribe
            gnmi >> SubscribeResponse {
                update { path: /interfaces/interface[$ifname:=name]/state value: $value }
            }
            gnmi << SubscribeRequest { prefix: $target count: #count path: /x[name=$ifname] }
            gnmi << SubscribeRequest { prefix: $target }
            close gnmi
        }",
    );
    let scenario = &dom.scenarios["S"];

    assert_eq!(declared_names(scenario), ["value", "target", "count"]);
    match &scenario.children[2].kind {
        InstructionKind::VarDeclaration { variable } => assert_eq!(variable.r#type, "int64"),
        kind => panic!("unexpected instruction {kind:?}"),
    }
}

#[test]
fn ignored_and_formal_params_are_not_declared() {
    let dom = compile(
        "scenario Helper(ifname: string) version 1.0.0 {
            execute Reboot($ifname, $other, _)
        }",
    );
    assert_eq!(declared_names(&dom.sub_scenarios["Helper"]), ["other"]);
}

#[test]
fn conflicting_variable_types() {
    let error = compile_for(
        "scenario S() version 1.0.0 { execute Reboot($x) execute Reboot(#x) }",
        "latest",
    )
    .unwrap_err();

    assert!(matches!(
        &error,
        PassError::ConflictingVariableType { name, first, second, .. }
            if name == "x" && first == "string" && second == "int64"
    ));
}

#[test]
fn type_conflicts_point_at_the_second_use() {
    let source = "scenario S() version 1.0.0 { execute Reboot($x) execute Reboot(#x) }";
    let error = compile_for(source, "latest").unwrap_err();

    let offset = |text| source.find(text).unwrap() as u32;
    match error {
        PassError::ConflictingVariableType {
            range, first_range, ..
        } => {
            assert_eq!(range, ByteRange::new(offset("#x"), offset("#x") + 2));
            assert_eq!(first_range, ByteRange::new(offset("$x"), offset("$x") + 2));
        }
        error => panic!("unexpected error {error:?}"),
    }
}

#[test]
fn formal_params_take_part_in_type_checks() {
    let source = "scenario Helper(x: string) version 1.0.0 { execute Reboot(#x) }";
    let error = compile_for(source, "latest").unwrap_err();

    match &error {
        PassError::ConflictingVariableType {
            scenario,
            name,
            first,
            second,
            first_range,
            ..
        } => {
            assert_eq!((scenario.as_str(), name.as_str()), ("Helper", "x"));
            assert_eq!((first.as_str(), second.as_str()), ("string", "int64"));
            let formal = source.find("x:").unwrap() as u32;
            assert_eq!(*first_range, ByteRange::new(formal, formal + 1));
        }
        error => panic!("unexpected error {error:?}"),
    }

    let dom = compile("scenario Helper(x: string) version 1.0.0 { execute Reboot($x) }");
    assert!(declared_names(&dom.sub_scenarios["Helper"]).is_empty());
}

#[test]
fn bindings_are_not_hoisted_even_after_a_read() {
    let dom = compile(
        "scenario S() version 1.0.0 {
            gnmi := gNMI.Subscribe
            gnmi >> SubscribeResponse { update { value: $ifname } }
            gnmi >> SubscribeResponse { update { path: /a[$ifname:=name] } }
            close gnmi
        }",
    );

    assert!(declared_names(&dom.scenarios["S"]).is_empty());
}

#[test]
fn coverage_entry_without_a_path() {
    let error = compile_for(
        "scenario stream() version 1.0.0 {
            gnmi := gNMI.Subscribe
            gnmi << SubscribeRequest {
                subscribe { mode: STREAM subscription [ { path: /a mode: SAMPLE } { mode: SAMPLE } ] }
            }
            close gnmi
        }",
        "latest",
    )
    .unwrap_err();

    assert!(matches!(
        error,
        PassError::MissingModeOrPath { scenario, id: Some(1), .. } if scenario == "stream"
    ));
}

#[test]
fn passes_after_version_resolution_are_idempotent() {
    let mut dom = compile(
        "scenario S() version 1.0.0 {
            gnmi := gNMI.Subscribe
            gnmi << SubscribeRequest {
                subscribe { mode: STREAM subscription [ { path: /a[name=$ifname] mode: SAMPLE } ] }
            }
            ZeroOrMore {
                AnyOrder { gnmi >> SubscribeResponse { update { path: /a[name=$ifname] } } }
                gnmi >> SubscribeResponse { }
            }
            gnmi >> SubscribeResponse { sync_response: true }
            close gnmi
        }
        scenario Helper(x: int64) version 1.0.0 { execute Reboot(#x, $y) }",
    );
    let once = dom.clone();

    for pass in &Pass::ALL[1..] {
        run_pass(&mut dom, *pass, &Options::default()).unwrap();
    }
    assert_eq!(dom, once);

    // nothing is pending any more
    run_pass(&mut dom, Pass::Versions, &Options::default()).unwrap();
    assert_eq!(dom, once);
}

#[test]
fn pass_names() {
    let names = Pass::ALL.iter().map(ToString::to_string).collect::<Vec<_>>();
    assert_eq!(
        names,
        [
            "version resolution",
            "variable declarations",
            "instruction ids",
            "back-to-back receives",
            "any-order channels",
            "path coverage",
        ],
    );
}
