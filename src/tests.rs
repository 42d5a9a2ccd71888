/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Crate unit tests.

use super::*;

fn assert_close(actual: f64, expected: f64, case: &str) {
    assert!(
        (actual - expected).abs() < 1e-12,
        "{case}: expected {expected}, got {actual}"
    );
}

/// Direct recursive tree evaluation, used as the reference the compiled
/// programs are checked against.
fn eval_tree(node: &MathNode, table: &VarTable, index: usize) -> f64 {
    match node {
        MathNode::Real(v) => *v,
        MathNode::Integer(v) => *v as f64,
        MathNode::Constant(c) => c.value(),
        MathNode::Name(name) => {
            let var = table.lookup(name).expect("binding exists");
            table.get(var).value.at(index).expect("value exists")
        }
        MathNode::Time => {
            let var = table.lookup(TIME_SYMBOL).expect("time binding");
            table.get(var).value.at(index).expect("time value")
        }
        MathNode::Apply(op, kids) => {
            let vals: Vec<f64> = kids.iter().map(|k| eval_tree(k, table, index)).collect();
            match op {
                MathOp::Plus => vals[0] + vals[1],
                MathOp::Minus => vals[0] - vals[1],
                MathOp::Times => vals[0] * vals[1],
                MathOp::Divide => vals[0] / vals[1],
                MathOp::Power => vals[0].powf(vals[1]),
                MathOp::Exp => vals[0].exp(),
                MathOp::Ln => vals[0].ln(),
                MathOp::Sqrt => vals[0].sqrt(),
                MathOp::Abs => vals[0].abs(),
                MathOp::Sin => vals[0].sin(),
                MathOp::Cos => vals[0].cos(),
                MathOp::And => {
                    if vals.iter().all(|v| *v != 0.0) { 1.0 } else { 0.0 }
                }
                MathOp::Not => {
                    if vals[0] != 0.0 { 0.0 } else { 1.0 }
                }
                other => panic!("reference evaluator does not model {other:?}"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Formula parser
// ---------------------------------------------------------------------------

#[test]
fn parses_precedence_and_associativity() {
    let table = {
        let mut t = VarTable::new();
        t.insert_time().unwrap();
        t
    };
    let cases = [
        ("1 + 2 * 3", 7.0),
        ("(1 + 2) * 3", 9.0),
        ("2 ^ 3 ^ 2", 512.0),
        ("8 - 3 - 2", 3.0),
        ("12 / 3 / 2", 2.0),
        ("-2 ^ 2", -4.0),
        ("2 * -3", -6.0),
        ("pow(2, 5)", 32.0),
        ("root(3, 27)", 3.0),
        ("log(10, 100)", 2.0),
        ("abs(-4)", 4.0),
        ("1 < 2", 1.0),
        ("2 <= 1", 0.0),
        ("1 == 1 && 2 > 1", 1.0),
        ("0 != 0 || 3 >= 3", 1.0),
        ("!(1 > 2)", 1.0),
        ("true", 1.0),
        ("false", 0.0),
    ];
    for (source, expected) in cases {
        let program = compile_formula(source, &table, false)
            .unwrap_or_else(|err| panic!("{source}: {err}"));
        let value = evaluate_uniform(&program, &table).expect("evaluates");
        assert_close(value, expected, source);
    }
}

#[test]
fn parses_integers_distinct_from_reals() {
    assert_eq!(parse_formula("5").unwrap(), MathNode::Integer(5));
    assert_eq!(parse_formula("5.0").unwrap(), MathNode::Real(5.0));
    assert_eq!(parse_formula("1e2").unwrap(), MathNode::Real(100.0));
}

#[test]
fn parses_named_constants_and_time() {
    assert_eq!(
        parse_formula("pi").unwrap(),
        MathNode::Constant(MathConstant::Pi)
    );
    assert_eq!(
        parse_formula("avogadro").unwrap(),
        MathNode::Constant(MathConstant::Avogadro)
    );
    assert_eq!(parse_formula("time").unwrap(), MathNode::Time);
    assert_eq!(
        parse_formula("substrate").unwrap(),
        MathNode::Name("substrate".to_string())
    );
}

#[test]
fn reports_parse_errors_with_caret() {
    let err = parse_formula("k1 * (S1 +").expect_err("parse should fail");
    assert_eq!(err.line, 1);
    assert!(err.column > 0);
    assert!(err.pointer.contains('^'));
    assert_eq!(err.snippet, "k1 * (S1 +");
}

#[test]
fn rejects_unknown_function_names() {
    let err = parse_formula("frobnicate(1, 2)").expect_err("parse should fail");
    assert!(
        err.message.contains("known function name"),
        "unexpected message '{}'",
        err.message
    );
}

#[test]
fn renders_formulas_back_to_infix() {
    let cases = [
        ("k1 * S1 - k2 * S2", "k1 * S1 - k2 * S2"),
        ("(a + b) * c", "(a + b) * c"),
        ("piecewise(1, a > 0, 2)", "piecewise(1, a > 0, 2)"),
    ];
    for (source, expected) in cases {
        let node = parse_formula(source).expect("parses");
        assert_eq!(node.to_string(), expected, "{source}");
    }
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

#[test]
fn unary_minus_normalizes_to_times_minus_one() {
    let mut node = parse_formula("-a").unwrap();
    normalize(&mut node).unwrap();
    assert_eq!(
        node,
        MathNode::Apply(
            MathOp::Times,
            vec![MathNode::Real(-1.0), MathNode::Name("a".to_string())]
        )
    );

    // Evaluating the normalized form matches -1.0 * a for sampled a.
    let mut table = VarTable::new();
    let a = table.insert_uniform("a", 0.0).unwrap();
    let reference = MathNode::Apply(
        MathOp::Times,
        vec![MathNode::Real(-1.0), MathNode::Name("a".to_string())],
    );
    for sample in [-3.5, -1.0, 0.0, 0.25, 7.0] {
        table.get_mut(a).value = Value::Scalar(sample);
        let program = compile_expression(&node, &table, false).unwrap();
        let direct = eval_tree(&reference, &table, 0);
        assert_close(
            evaluate_uniform(&program, &table).unwrap(),
            direct,
            "normalized -a",
        );
    }
}

#[test]
fn unary_plus_normalizes_to_times_one() {
    let mut node = MathNode::Apply(MathOp::Plus, vec![MathNode::Name("a".to_string())]);
    normalize(&mut node).unwrap();
    assert_eq!(
        node,
        MathNode::Apply(
            MathOp::Times,
            vec![MathNode::Real(1.0), MathNode::Name("a".to_string())]
        )
    );
}

#[test]
fn times_literal_zero_collapses_to_zero() {
    let mut node = parse_formula("0 * (S1 + k1 * S2)").unwrap();
    normalize(&mut node).unwrap();
    assert_eq!(node, MathNode::Real(0.0));
    // No references to the discarded children survive.
    assert_eq!(node.node_count(), 1);
    assert!(node.named_references().is_empty());

    let mut node = parse_formula("(S1 + S2) * 0.0").unwrap();
    normalize(&mut node).unwrap();
    assert_eq!(node, MathNode::Real(0.0));
}

#[test]
fn single_operand_logicals_gain_literal_one() {
    let mut node = MathNode::Apply(MathOp::And, vec![MathNode::Name("c".to_string())]);
    normalize(&mut node).unwrap();
    assert_eq!(
        node,
        MathNode::Apply(
            MathOp::And,
            vec![MathNode::Name("c".to_string()), MathNode::Integer(1)]
        )
    );
}

#[test]
fn wide_logicals_reduce_to_left_associated_chains() {
    let mut node = parse_formula("and(a, b, c)").unwrap();
    normalize(&mut node).unwrap();
    let inner = MathNode::Apply(
        MathOp::And,
        vec![
            MathNode::Name("a".to_string()),
            MathNode::Name("b".to_string()),
        ],
    );
    assert_eq!(
        node,
        MathNode::Apply(MathOp::And, vec![inner, MathNode::Name("c".to_string())])
    );
}

#[test]
fn piecewise_three_branch_truth_table() {
    let mut node = parse_formula("piecewise(e1, c1, e2, c2, o)").unwrap();
    normalize(&mut node).unwrap();

    let mut table = VarTable::new();
    let c1 = table.insert_uniform("c1", 0.0).unwrap();
    let c2 = table.insert_uniform("c2", 0.0).unwrap();
    table.insert_uniform("e1", 10.0).unwrap();
    table.insert_uniform("e2", 20.0).unwrap();
    table.insert_uniform("o", 30.0).unwrap();

    // (c1, c2) -> expected value; both-true is additive by construction and
    // outside the piecewise contract, so it is not sampled.
    let cases = [
        (1.0, 0.0, 10.0),
        (0.0, 1.0, 20.0),
        (0.0, 0.0, 30.0),
    ];
    let program = compile_expression(&node, &table, false).unwrap();
    for (v1, v2, expected) in cases {
        table.get_mut(c1).value = Value::Scalar(v1);
        table.get_mut(c2).value = Value::Scalar(v2);
        let value = evaluate_uniform(&program, &table).unwrap();
        assert_close(value, expected, "piecewise({v1}, {v2})");
    }
}

#[test]
fn piecewise_without_otherwise_defaults_to_zero() {
    let mut node = parse_formula("piecewise(e1, c1)").unwrap();
    normalize(&mut node).unwrap();

    let mut table = VarTable::new();
    let c1 = table.insert_uniform("c1", 0.0).unwrap();
    table.insert_uniform("e1", 10.0).unwrap();
    let program = compile_expression(&node, &table, false).unwrap();

    assert_close(evaluate_uniform(&program, &table).unwrap(), 0.0, "no match");
    table.get_mut(c1).value = Value::Scalar(1.0);
    assert_close(evaluate_uniform(&program, &table).unwrap(), 10.0, "match");
}

// ---------------------------------------------------------------------------
// Compiler and evaluator
// ---------------------------------------------------------------------------

#[test]
fn uniform_expressions_match_direct_tree_evaluation() {
    let mut table = VarTable::new();
    table.insert_time().unwrap();
    table.insert_uniform("k", 1.5).unwrap();
    let sources = [
        "2 + 3 * 4",
        "k * exp(0) + sqrt(16)",
        "ln(exponentiale)",
        "cos(0) + sin(0)",
        "k ^ 2 / 3",
        "abs(2 - k * 4)",
    ];
    for source in sources {
        let mut node = parse_formula(source).unwrap();
        normalize(&mut node).unwrap();
        let program = compile_expression(&node, &table, false).unwrap();
        let direct = eval_tree(&node, &table, 0);
        // Any node index yields the same value for uniform-only programs.
        for index in [0, 3, 17] {
            assert_close(evaluate(&program, &table, index).unwrap(), direct, source);
        }
    }
}

#[test]
fn compiles_two_species_rate_and_evaluates_at_node() {
    let nodes = 32;
    let mut table = VarTable::new();
    table.insert_uniform("k1", 0.1).unwrap();
    table.insert_uniform("k2", 0.2).unwrap();
    let s1 = table
        .insert_field("S1", vec![0.0; nodes], Some(vec![0.0; 4 * nodes]))
        .unwrap();
    let s2 = table
        .insert_field("S2", vec![0.0; nodes], Some(vec![0.0; 4 * nodes]))
        .unwrap();
    if let Value::Field(values) = &mut table.get_mut(s1).value {
        values[5] = 2.0;
    }
    if let Value::Field(values) = &mut table.get_mut(s2).value {
        values[5] = 3.0;
    }

    let program = compile_formula("k1 * S1 - k2 * S2", &table, true).unwrap();
    assert_close(evaluate(&program, &table, 5).unwrap(), -0.4, "k1*S1 - k2*S2");

    // Uniform rate constants compile into constant slots, per-node species
    // into variable slots with derivative tracking.
    let mut const_slots = 0;
    let mut var_slots = 0;
    let mut deriv_slots = 0;
    for at in 0..program.len() {
        if program.const_at(at).is_some() {
            const_slots += 1;
        }
        if program.var_at(at).is_some() {
            var_slots += 1;
        }
        if program.deriv_at(at).is_some() {
            deriv_slots += 1;
        }
    }
    assert_eq!(const_slots, 2);
    assert_eq!(var_slots, 2);
    assert_eq!(deriv_slots, 2);
}

#[test]
fn uniform_binding_edits_are_observed_without_recompiling() {
    let mut table = VarTable::new();
    let k = table.insert_uniform("k", 2.0).unwrap();
    let program = compile_formula("k * 3", &table, false).unwrap();
    assert_close(evaluate_uniform(&program, &table).unwrap(), 6.0, "before");
    table.get_mut(k).value = Value::Scalar(5.0);
    assert_close(evaluate_uniform(&program, &table).unwrap(), 15.0, "after");
}

#[test]
fn shared_cursor_wraps_across_sibling_compilations() {
    let table = VarTable::new();
    let node = {
        let mut n = parse_formula("1 + 2").unwrap();
        normalize(&mut n).unwrap();
        n
    };
    let len = node.node_count();
    assert_eq!(len, 3);

    let mut program = CompiledProgram::with_len(len);
    let mut cursor = Cursor::new(len);
    compile_into(&node, &table, false, &mut program, &mut cursor).unwrap();
    // The cursor wrapped back to slot zero, so a sibling compilation lands
    // on the same slots and the program is unchanged.
    assert_eq!(cursor.position(), 0);
    let first = program.clone();
    compile_into(&node, &table, false, &mut program, &mut cursor).unwrap();
    assert_eq!(program, first);
    assert_close(evaluate_uniform(&program, &table).unwrap(), 3.0, "1 + 2");
}

#[test]
fn time_resolves_through_the_reserved_binding() {
    let mut table = VarTable::new();
    let time = table.insert_time().unwrap();
    let program = compile_formula("time * 2", &table, false).unwrap();
    assert_close(evaluate_uniform(&program, &table).unwrap(), 0.0, "t=0");
    table.get_mut(time).value = Value::Scalar(4.0);
    assert_close(evaluate_uniform(&program, &table).unwrap(), 8.0, "t=4");
}

#[test]
fn unresolved_references_are_compile_errors() {
    let table = VarTable::new();
    let err = compile_formula("missing * 2", &table, false).expect_err("must fail");
    assert!(
        err.message.contains("Unresolved reference 'missing'"),
        "unexpected message '{}'",
        err.message
    );
}

#[test]
fn unnormalized_trees_are_rejected_by_the_compiler() {
    let table = VarTable::new();
    let unary = MathNode::Apply(MathOp::Minus, vec![MathNode::Real(1.0)]);
    assert!(compile_expression(&unary, &table, false).is_err());

    let piecewise = parse_formula("piecewise(1, true, 2)").unwrap();
    let err = compile_expression(&piecewise, &table, false).expect_err("must fail");
    assert!(err.message.contains("piecewise"));
}

#[test]
fn expression_depth_is_bounded() {
    let mut node = MathNode::Name("x".to_string());
    for _ in 0..MAX_EXPRESSION_DEPTH {
        node = MathNode::Apply(MathOp::Plus, vec![node, MathNode::Integer(1)]);
    }
    let err = normalize(&mut node).expect_err("must fail");
    assert!(err.message.contains("maximum depth"));
}

#[test]
fn collects_expression_dependencies_in_first_use_order() {
    let mut table = VarTable::new();
    let k1 = table.insert_uniform("k1", 0.0).unwrap();
    let s1 = table.insert_uniform("S1", 0.0).unwrap();
    let k2 = table.insert_uniform("k2", 0.0).unwrap();
    let node = parse_formula("k1 * S1 - k2 * S1").unwrap();
    assert_eq!(table.expression_dependencies(&node), vec![k1, s1, k2]);
}

// ---------------------------------------------------------------------------
// Model ingestion
// ---------------------------------------------------------------------------

fn two_compartment_description() -> ModelDescription {
    ModelDescription {
        compartments: vec![
            CompartmentDesc {
                id: "cytosol".to_string(),
                spatial_dimensions: 2,
                size: Some(1.0),
            },
            CompartmentDesc {
                id: "nucleus".to_string(),
                spatial_dimensions: 2,
                size: Some(1.0),
            },
            CompartmentDesc {
                id: "shell".to_string(),
                spatial_dimensions: 1,
                size: None,
            },
        ],
        species: vec![
            SpeciesDesc {
                id: "S1".to_string(),
                compartment: "cytosol".to_string(),
                is_spatial: true,
                initial: Some(SpeciesInitial::Concentration(2.0)),
                constant: false,
                boundary_condition: false,
            },
            SpeciesDesc {
                id: "S2".to_string(),
                compartment: "nucleus".to_string(),
                is_spatial: true,
                initial: Some(SpeciesInitial::Concentration(3.0)),
                constant: false,
                boundary_condition: true,
            },
            SpeciesDesc {
                id: "M".to_string(),
                compartment: "shell".to_string(),
                is_spatial: true,
                initial: Some(SpeciesInitial::Amount(0.5)),
                constant: false,
                boundary_condition: false,
            },
        ],
        parameters: vec![
            ParameterDesc {
                id: "k1".to_string(),
                value: Some(0.1),
                role: ParameterRole::Plain,
            },
            ParameterDesc {
                id: "k2".to_string(),
                value: Some(0.2),
                role: ParameterRole::Plain,
            },
            ParameterDesc {
                id: "D_S1".to_string(),
                value: Some(1e-3),
                role: ParameterRole::Diffusion {
                    species: "S1".to_string(),
                    kind: DiffusionKind::Isotropic,
                },
            },
            ParameterDesc {
                id: "vx_S1".to_string(),
                value: Some(0.4),
                role: ParameterRole::Advection {
                    species: "S1".to_string(),
                    axis: SpatialAxis::X,
                },
            },
            ParameterDesc {
                id: "bc_S2".to_string(),
                value: Some(0.0),
                role: ParameterRole::BoundaryCondition {
                    species: "S2".to_string(),
                    face: BoundaryFace::XMax,
                },
            },
            ParameterDesc {
                id: "x".to_string(),
                value: None,
                role: ParameterRole::CoordinateAxis {
                    axis: SpatialAxis::X,
                },
            },
            ParameterDesc {
                id: "kdrift".to_string(),
                value: Some(0.0),
                role: ParameterRole::Plain,
            },
        ],
        reactions: vec![ReactionDesc {
            id: "transport".to_string(),
            fast: false,
            reactants: vec![SpeciesRefDesc {
                species: "S1".to_string(),
                stoichiometry: 1.0,
            }],
            products: vec![SpeciesRefDesc {
                species: "S2".to_string(),
                stoichiometry: 1.0,
            }],
            modifiers: vec!["M".to_string()],
            kinetic_law: Some(parse_formula("kcat * (k1 * S1 - k2 * S2)").unwrap()),
            local_parameters: vec![LocalParameterDesc {
                id: "kcat".to_string(),
                value: Some(1.0),
            }],
        }],
        rate_rules: vec![RateRuleDesc {
            variable: "kdrift".to_string(),
            math: parse_formula("0.01 * time").unwrap(),
        }],
    }
}

#[test]
fn ingests_a_two_compartment_model() {
    let grid = GridDim::new_2d(5, 5, (0.0, 4.0), (0.0, 4.0));
    let model = Model::from_description(&two_compartment_description(), &grid).unwrap();

    // kdrift is governed by a rate rule, so it stays unresolved; k1 keeps
    // its literal value.
    let kdrift = model.table.lookup("kdrift").expect("kdrift registered");
    assert!(!model.table.get(kdrift).is_resolved);
    let k1 = model.table.lookup("k1").expect("k1 registered");
    assert!(model.table.get(k1).is_resolved);

    // Species storage spans the doubled-resolution grid with a delta buffer
    // per face direction.
    let s1 = model.table.lookup("S1").expect("S1 registered");
    let binding = model.table.get(s1);
    assert!(!binding.is_uniform());
    assert!(binding.in_vol);
    match &binding.value {
        Value::Field(values) => assert_eq!(values.len(), grid.num_indexes()),
        Value::Scalar(_) => panic!("S1 must be a field"),
    }
    assert_eq!(
        binding.delta.as_ref().map(Vec::len),
        Some(4 * grid.num_indexes())
    );

    // Membrane species resolve against their lower-dimensional compartment.
    let membrane = model.table.lookup("M").expect("M registered");
    assert!(!model.table.get(membrane).in_vol);

    // Diffusion wiring covers both active axes, advection only X.
    let diffusion = model.table.get(s1).diffusion;
    assert!(diffusion[0].is_some() && diffusion[1].is_some() && diffusion[2].is_none());
    let advection = model.table.get(s1).advection;
    assert!(advection[0].is_some() && advection[1].is_none());
    let s2 = model.table.lookup("S2").expect("S2 registered");
    assert!(model.table.get(s2).boundary[BoundaryFace::XMax.index()].is_some());

    // Axis binding carries per-node coordinates.
    let x = model.axes[SpatialAxis::X.index()].expect("axis registered");
    assert_close(
        model.table.get(x).value.at(1).unwrap(),
        0.5,
        "x coordinate of node 1",
    );

    // One reaction plus one rate rule, no fast reactions.
    assert_eq!(model.programs.len(), 2);
    assert!(model.fast_programs.is_empty());
}

#[test]
fn flags_cross_compartment_reactions_as_membrane_transport() {
    let grid = GridDim::new_2d(5, 5, (0.0, 4.0), (0.0, 4.0));
    let model = Model::from_description(&two_compartment_description(), &grid).unwrap();
    let reaction = &model.programs[0];
    assert!(reaction.is_mem_transport);
    assert_eq!(reaction.result.len(), grid.num_indexes());

    // Reactants, then products, then modifiers; the boundary-condition
    // product is immutable, the modifier carries zero stoichiometry.
    assert_eq!(reaction.participants.len(), 3);
    assert!(reaction.participants[0].is_mutable);
    assert!(!reaction.participants[1].is_mutable);
    assert_close(reaction.participants[2].stoichiometry, 0.0, "modifier");

    // The compiled law evaluates with the local parameter in scope:
    // kcat * (k1*S1 - k2*S2) = 1.0 * (0.1*2.0 - 0.2*3.0).
    assert_close(
        evaluate(&reaction.program, &model.table, 5).unwrap(),
        -0.4,
        "transport law at node 5",
    );

    let rule = &model.programs[1];
    assert!(!rule.is_mem_transport);
    assert_eq!(rule.participants.len(), 1);
    assert_close(rule.participants[0].stoichiometry, 1.0, "rule target");
}

// ---------------------------------------------------------------------------
// Boundary geometry
// ---------------------------------------------------------------------------

fn blank_membrane(id: &str, dim: &GridDim) -> DomainRaster {
    DomainRaster {
        id: id.to_string(),
        class: vec![CellClass::Outside; dim.num_indexes()],
        boundary: Vec::new(),
        face_touch: vec![FaceTouch::default(); dim.num_indexes()],
        is_vol: false,
    }
}

/// Two interior nodes two steps apart on a horizontal line, bridged by one
/// face midpoint; spacing is 1 in both axes.
fn two_node_membrane() -> (GridDim, DomainRaster) {
    let dim = GridDim::new_2d(5, 5, (0.0, 4.0), (0.0, 4.0));
    let mut raster = blank_membrane("flat", &dim);
    let spans_y = FaceTouch {
        yp: true,
        ym: true,
        ..FaceTouch::default()
    };
    for (x, class) in [
        (2, CellClass::Interior),
        (3, CellClass::FaceMidpoint),
        (4, CellClass::Interior),
    ] {
        let index = dim.flatten(x, 4, 0);
        raster.class[index] = class;
        raster.face_touch[index] = spans_y;
        if class == CellClass::Interior {
            raster.boundary.push(index);
        }
    }
    (dim, raster)
}

#[test]
fn flat_two_node_membrane_yields_in_plane_unit_normals() {
    let (dim, raster) = two_node_membrane();
    let config = GeometryConfig::default();
    let geometry = build_surface_geometry(&[raster], &dim, &config).unwrap();

    for x in [2, 4] {
        let index = dim.flatten(x, 4, 0);
        let normal = geometry.normals[index].expect("normal at boundary node");
        // Perpendicular to the horizontal contour, unit length, no
        // out-of-plane component in 2-D.
        assert_close(normal.x, 0.0, "nx");
        assert_close(normal.y.abs(), 1.0, "|ny|");
        assert_close(normal.z, 0.0, "nz");
    }
}

#[test]
fn flat_two_node_membrane_dual_distance_equals_grid_spacing() {
    let (dim, raster) = two_node_membrane();
    let config = GeometryConfig::default();
    let geometry = build_surface_geometry(&[raster], &dim, &config).unwrap();

    let left = dim.flatten(2, 4, 0);
    let right = dim.flatten(4, 4, 0);
    let forward = geometry.duals[left].plane(Plane::Xy);
    assert_eq!(forward.neighbors[0], Some(right));
    assert_eq!(forward.neighbors[1], None);
    assert_close(forward.distance[0], 1.0, "d equals spacing");

    // Symmetrization leaves both directions bit-identical.
    let backward = geometry.duals[right].plane(Plane::Xy);
    assert_eq!(backward.neighbors[0], Some(left));
    assert!(forward.distance[0] == backward.distance[0]);
    assert!(forward.face_length[0] == backward.face_length[0]);
    assert!(forward.averaged[0] && backward.averaged[0]);
}

/// A closed square ring membrane with eight interior nodes.
fn square_ring_membrane() -> (GridDim, DomainRaster) {
    let dim = GridDim::new_2d(5, 5, (0.0, 4.0), (0.0, 4.0));
    let mut raster = blank_membrane("ring", &dim);
    let spans_both = FaceTouch {
        xp: true,
        xm: true,
        yp: true,
        ym: true,
        ..FaceTouch::default()
    };
    let ring = [
        (2, 2),
        (4, 2),
        (6, 2),
        (6, 4),
        (6, 6),
        (4, 6),
        (2, 6),
        (2, 4),
    ];
    let midpoints = [
        (3, 2),
        (5, 2),
        (6, 3),
        (6, 5),
        (5, 6),
        (3, 6),
        (2, 5),
        (2, 3),
    ];
    for (x, y) in ring {
        let index = dim.flatten(x, y, 0);
        raster.class[index] = CellClass::Interior;
        raster.face_touch[index] = spans_both;
        raster.boundary.push(index);
    }
    for (x, y) in midpoints {
        raster.class[dim.flatten(x, y, 0)] = CellClass::FaceMidpoint;
    }
    (dim, raster)
}

#[test]
fn square_ring_normals_are_unit_length_everywhere() {
    let (dim, raster) = square_ring_membrane();
    let boundary = raster.boundary.clone();
    let config = GeometryConfig::default();
    let geometry = build_surface_geometry(&[raster], &dim, &config).unwrap();

    for index in boundary {
        let normal = geometry.normals[index].expect("normal at ring node");
        let len = (normal.x * normal.x + normal.y * normal.y + normal.z * normal.z).sqrt();
        assert_close(len, 1.0, "unit normal");
        assert_close(normal.z, 0.0, "in-plane normal");
    }
}

#[test]
fn square_ring_dual_is_symmetric_across_every_pair() {
    let (dim, raster) = square_ring_membrane();
    let boundary = raster.boundary.clone();
    let config = GeometryConfig::default();
    let geometry = build_surface_geometry(&[raster], &dim, &config).unwrap();

    for &index in &boundary {
        let dual = geometry.duals[index].plane(Plane::Xy);
        for branch in 0..2 {
            let neighbor = dual.neighbors[branch].expect("ring nodes have two neighbors");
            let back = geometry.duals[neighbor].plane(Plane::Xy);
            let k = (0..2)
                .find(|&k| back.neighbors[k] == Some(index))
                .expect("back-reference");
            assert!(dual.distance[branch] == back.distance[k], "d symmetric");
            assert!(
                dual.face_length[branch] == back.face_length[k],
                "s symmetric"
            );
            assert!(dual.averaged[branch]);
        }
    }
}

/// A flat membrane plane at constant Z inside a 3-D grid, unit spacing.
fn flat_plane_membrane_3d() -> (GridDim, DomainRaster) {
    let dim = GridDim::new_3d(5, 5, 3, (0.0, 4.0), (0.0, 4.0), (0.0, 2.0));
    let mut raster = blank_membrane("plane", &dim);
    let spans_z = FaceTouch {
        zp: true,
        zm: true,
        ..FaceTouch::default()
    };
    let z = 2;
    for y in 0..dim.y_index() {
        for x in 0..dim.x_index() {
            let index = dim.flatten(x, y, z);
            if x % 2 == 0 && y % 2 == 0 {
                raster.class[index] = CellClass::Interior;
                raster.face_touch[index] = spans_z;
                raster.boundary.push(index);
            } else if x % 2 != y % 2 {
                raster.class[index] = CellClass::FaceMidpoint;
            }
        }
    }
    (dim, raster)
}

#[test]
fn flat_plane_membrane_normals_point_out_of_plane() {
    let (dim, raster) = flat_plane_membrane_3d();
    let boundary = raster.boundary.clone();
    let config = GeometryConfig::default();
    let geometry = build_surface_geometry(&[raster], &dim, &config).unwrap();

    for index in boundary {
        let normal = geometry.normals[index].expect("normal at plane node");
        assert_close(normal.x, 0.0, "nx");
        assert_close(normal.y, 0.0, "ny");
        assert_close(normal.z.abs(), 1.0, "|nz|");
    }
}

#[test]
fn flat_plane_membrane_duals_match_grid_spacing() {
    let (dim, raster) = flat_plane_membrane_3d();
    let config = GeometryConfig::default();
    let geometry = build_surface_geometry(&[raster], &dim, &config).unwrap();

    // Interior node of the plane: both planes carry distance and face
    // length equal to the unit spacing.
    let center = dim.flatten(4, 4, 2);
    for plane in [Plane::Yz, Plane::Xz] {
        let dual = geometry.duals[center].plane(plane);
        for branch in 0..2 {
            assert!(dual.neighbors[branch].is_some(), "two neighbors in {plane}");
            assert_close(dual.distance[branch], 1.0, "d equals spacing");
            assert_close(dual.face_length[branch], 1.0, "s equals spacing");
        }
    }
}

#[test]
fn isolated_boundary_node_is_degenerate_geometry() {
    let dim = GridDim::new_2d(5, 5, (0.0, 4.0), (0.0, 4.0));
    let mut raster = blank_membrane("lonely", &dim);
    let index = dim.flatten(4, 4, 0);
    raster.class[index] = CellClass::Interior;
    raster.face_touch[index] = FaceTouch {
        yp: true,
        ym: true,
        ..FaceTouch::default()
    };
    raster.boundary.push(index);

    let config = GeometryConfig::default();
    let err = build_surface_geometry(&[raster], &dim, &config).expect_err("must fail");
    assert_eq!(err, GeometryError::DegenerateBoundaryGeometry { index });
}

#[test]
fn walk_that_cannot_close_is_reported_as_unterminated() {
    // A tail node leading into a loop that never revisits the tail: the
    // circuit walk exhausts its budget while still moving.
    let dim = GridDim::new_2d(7, 7, (0.0, 6.0), (0.0, 6.0));
    let mut raster = blank_membrane("tailed", &dim);
    let spans_both = FaceTouch {
        xp: true,
        xm: true,
        yp: true,
        ym: true,
        ..FaceTouch::default()
    };
    let interiors = [(2, 4), (4, 4), (4, 6), (6, 6), (6, 4)];
    let midpoints = [(3, 4), (4, 5), (5, 6), (6, 5), (5, 4)];
    for (x, y) in interiors {
        let index = dim.flatten(x, y, 0);
        raster.class[index] = CellClass::Interior;
        raster.face_touch[index] = spans_both;
        raster.boundary.push(index);
    }
    for (x, y) in midpoints {
        raster.class[dim.flatten(x, y, 0)] = CellClass::FaceMidpoint;
    }

    let config = GeometryConfig::default();
    let err = build_surface_geometry(&[raster], &dim, &config).expect_err("must fail");
    assert!(matches!(
        err,
        GeometryError::UnterminatedContourWalk { .. }
    ));
}

#[test]
fn grid_dim_round_trips_indices_and_positions() {
    let dim = GridDim::new_3d(4, 5, 3, (0.0, 3.0), (-2.0, 2.0), (1.0, 3.0));
    assert_eq!(dim.x_index(), 7);
    assert_eq!(dim.y_index(), 9);
    assert_eq!(dim.z_index(), 5);
    assert_eq!(dim.dimension(), 3);

    for index in [0, 1, 42, dim.num_indexes() - 1] {
        let (x, y, z) = dim.unflatten(index);
        assert_eq!(dim.flatten(x, y, z), index);
    }

    let origin = dim.position(0);
    assert_close(origin.0, 0.0, "x origin");
    assert_close(origin.1, -2.0, "y origin");
    assert_close(origin.2, 1.0, "z origin");
    assert_close(dim.plane_spacing(Plane::Xy), 1.0, "mean xy spacing");
}
