use cinderir::{
    function::Function,
    types::Type,
    value::{Insn, InsnKind, Value, ValueId},
};

fn compute(f: &mut Function, opcode: &str, operands: Vec<ValueId>) -> ValueId {
    f.new_insn(
        Type::named("i32"),
        InsnKind::Compute {
            opcode: opcode.to_string(),
        },
        operands,
    )
}

fn find_compute<'a>(f: &'a Function, opcode: &str) -> (ValueId, &'a Insn) {
    f.insns()
        .find(|(_, insn)| matches!(&insn.kind, InsnKind::Compute { opcode: o } if o == opcode))
        .expect("no attached instruction with that opcode")
}

#[test]
fn a_shared_operand_clones_exactly_once() {
    let mut f = Function::new("f");
    let block = f.create_block(Some("entry")).unwrap();
    let v = f.new_argument(Some("v"), Type::named("i32"));
    f.set_arguments(vec![v]).unwrap();
    let u1 = compute(&mut f, "use1", vec![v]);
    let u2 = compute(&mut f, "use2", vec![v]);
    f.append(block, u1).unwrap();
    f.append(block, u2).unwrap();

    let clone = f.clone();

    let (_, c1) = find_compute(&clone, "use1");
    let (_, c2) = find_compute(&clone, "use2");
    assert_eq!(
        c1.operands(),
        c2.operands(),
        "both users reference the same cloned value"
    );
    let target = c1.operands()[0];
    assert_eq!(target, clone.arguments()[0]);
    assert_eq!(clone.value(target).unwrap().name(), "v");
}

#[test]
fn clones_are_fully_independent() {
    let mut f = Function::new("f");
    let block = f.create_block(Some("entry")).unwrap();
    let v = f.new_argument(Some("v"), Type::named("i32"));
    f.set_arguments(vec![v]).unwrap();
    let user = compute(&mut f, "user", vec![v]);
    f.append(block, user).unwrap();

    let clone = f.clone();

    if let Some(Value::Argument(argument)) = f.value_mut(v) {
        argument.ty = Type::named("i64");
    }
    f.remove_insn(user);

    assert_eq!(
        clone.value(clone.arguments()[0]).unwrap().ty(),
        &Type::named("i32"),
        "mutating the original must not leak into the clone"
    );
    assert_eq!(clone.insns().count(), 1);
}

#[test]
fn forward_references_translate_through_the_clone_map() {
    let mut f = Function::new("loop");
    let header = f.create_block(Some("header")).unwrap();
    let latch = f.create_block(Some("latch")).unwrap();

    // phi and step reference each other across blocks
    let phi = f.new_insn(
        Type::named("i32"),
        InsnKind::Phi {
            blocks: vec!["latch".to_string()],
        },
        vec![],
    );
    let step = compute(&mut f, "step", vec![phi]);
    f.insn_mut(phi).unwrap().set_operands([step]);
    f.append(header, phi).unwrap();
    f.append(latch, step).unwrap();

    let clone = f.clone();

    let (cphi_id, cphi) = clone.insns().find(|(_, insn)| insn.kind.is_phi()).unwrap();
    let (cstep_id, cstep) = find_compute(&clone, "step");
    assert_eq!(cphi.operands(), &[cstep_id]);
    assert_eq!(cstep.operands(), &[cphi_id]);
}

#[test]
fn detached_operands_are_cloned_on_demand_and_orphans_dropped() {
    let mut f = Function::new("f");
    let block = f.create_block(Some("entry")).unwrap();
    let scratch = compute(&mut f, "scratch", vec![]);
    let orphan = compute(&mut f, "orphan", vec![]);
    let user = compute(&mut f, "user", vec![scratch]);
    f.append(block, user).unwrap();

    let clone = f.clone();

    let (_, cuser) = find_compute(&clone, "user");
    let target = cuser.operands()[0];
    match clone.value(target).unwrap() {
        Value::Insn(insn) => {
            assert!(matches!(&insn.kind, InsnKind::Compute { opcode } if opcode == "scratch"));
            assert_eq!(insn.block(), None, "the operand's clone stays detached");
        }
        Value::Argument(_) => panic!("expected an instruction clone"),
    }

    let orphan_survives = clone.values().any(|(_, value)| {
        matches!(value, Value::Insn(insn)
            if matches!(&insn.kind, InsnKind::Compute { opcode } if opcode == "orphan"))
    });
    assert!(!orphan_survives, "unreferenced detached values are dropped");
    let _ = (scratch, orphan);
}

#[test]
fn clones_reset_to_the_original_name_and_prefix_reservations() {
    let mut f = Function::new("f");
    f.make_name(Some("x"));
    f.set_name("g");

    let mut clone = f.clone();

    assert_eq!(f.name(), Some("g"));
    assert_eq!(clone.name(), Some("f"));
    assert_eq!(clone.original_name(), Some("f"));
    assert_eq!(
        clone.make_name(Some("x")),
        "x",
        "prefix reservations do not carry over"
    );
}

#[test]
fn the_entry_reference_follows_the_clone() {
    let mut f = Function::new("f");
    let entry = f.create_block(Some("entry")).unwrap();
    let exit = f.create_block(Some("exit")).unwrap();
    f.entry = Some(entry);

    let jump = f.new_insn(
        Type::Bottom,
        InsnKind::Jump {
            target: "exit".to_string(),
        },
        vec![],
    );
    f.append(entry, jump).unwrap();
    let ret = f.new_insn(Type::Bottom, InsnKind::Return, vec![]);
    f.append(exit, ret).unwrap();

    let clone = f.clone();

    let centry = clone.entry.expect("the clone keeps a designated entry");
    assert_eq!(clone.block(centry).unwrap().name(), "entry");
    let csuccessors = clone.successors(centry).unwrap();
    assert_eq!(csuccessors.len(), 1);
    assert_eq!(clone.block(csuccessors[0]).unwrap().name(), "exit");
    assert!(clone.exits(csuccessors[0]));
    let _ = exit;
}

#[test]
fn a_stale_entry_stays_unset_in_the_clone() {
    let mut f = Function::new("f");
    let entry = f.create_block(Some("entry")).unwrap();
    f.entry = Some(entry);
    f.remove_block(entry);

    let clone = f.clone();
    assert_eq!(clone.entry, None);
}

#[test]
fn cloned_argument_lists_preserve_order_and_ownership() {
    let mut f = Function::new("f");
    let a = f.new_argument(Some("a"), Type::named("i32"));
    let b = f.new_argument(Some("b"), Type::named("bool"));
    f.set_arguments(vec![a, b]).unwrap();

    let clone = f.clone();

    let names: Vec<&str> = clone
        .arguments()
        .iter()
        .map(|&id| clone.value(id).unwrap().name())
        .collect();
    assert_eq!(names, vec!["a", "b"]);
}
