use ecl_ast::{ClassMember, Decl, ExprKind, Stmt, Variance};
use ecl_parse::{parse_expr, parse_source, parse_source_with_recovery};

const PRELUDE: &str = r#"<?hh
// Copyright notice
<<file: __EnableUnstableFeatures('enum_atom', 'enum_class')>>

interface ExBox {}

class Box<T> implements ExBox {
  public function __construct(public T $data) {}
}

class IBox extends Box<int> {
  public function add(int $x): void {
    $this->data = $this->data + $x;
  }
}

abstract final class Helper {
  public static function ibox(): IBox {
    return new IBox(42);
  }
}
"#;

#[test]
fn class_hierarchy_fixture_parses() {
    let program = parse_source(PRELUDE).expect("prelude should parse");
    assert_eq!(program.file_features, vec!["enum_atom", "enum_class"]);
    assert_eq!(program.decls.len(), 4);

    let Decl::Class(boxed) = &program.decls[1] else {
        panic!("expected class Box");
    };
    assert_eq!(boxed.type_params[0].name.node, "T");
    assert_eq!(boxed.implements[0].name.node, "ExBox");
    let ClassMember::Method(ctor) = &boxed.members[0] else {
        panic!("expected constructor");
    };
    assert!(ctor.params[0].promoted.is_some());

    let Decl::Class(helper) = &program.decls[3] else {
        panic!("expected class Helper");
    };
    assert!(helper.is_abstract && helper.is_final);
}

#[test]
fn enum_class_with_constants_and_generic_function() {
    let src = format!(
        "{PRELUDE}\n{}",
        r#"
enum class E: ExBox {
   Box<string> A = new Box('bli');
   IBox B = Helper::ibox();
   Box<int> B2 = new Box(42);
}

function generic<TEnum as E, +T>(HH\MemberOf<TEnum, Box<T>> $param): T {
  return $param->data;
}
"#
    );
    let program = parse_source(&src).expect("fixture should parse");

    let Decl::EnumClass(e) = &program.decls[4] else {
        panic!("expected enum class");
    };
    let names: Vec<_> = e.constants.iter().map(|c| c.name.node.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "B2"]);
    assert!(matches!(e.constants[1].init.kind, ExprKind::StaticCall { .. }));

    let Decl::Function(f) = &program.decls[5] else {
        panic!("expected function");
    };
    assert_eq!(f.type_params[0].bound.as_ref().map(|b| b.name.node.as_str()), Some("E"));
    assert_eq!(f.type_params[1].variance, Variance::Covariant);
    assert_eq!(f.params[0].ty.name.node, "HH\\MemberOf");
    assert!(matches!(f.body.stmts[0], Stmt::Return(_)));
}

#[test]
fn atom_parameters_and_entry_points() {
    let src = format!(
        "{PRELUDE}\n{}",
        r#"
const string NAME = "A";

function f<T>(<<__Atom>> HH\MemberOf<E, Box<T>> $elt) : T {
  return $elt->data;
}

<<__EntryPoint>>
function main() {
    $x = "A";
    echo("Hello " . f($x) . "!\n");
    echo f<string>(NAME), f(#A);
}
"#
    );
    let program = parse_source(&src).expect("fixture should parse");

    let Decl::Const(c) = &program.decls[4] else {
        panic!("expected const");
    };
    assert_eq!(c.ty.as_ref().map(|t| t.name.node.as_str()), Some("string"));

    let Decl::Function(f) = &program.decls[5] else {
        panic!("expected function");
    };
    assert!(f.params[0].has_attribute("__Atom"));

    let Decl::Function(main) = &program.decls[6] else {
        panic!("expected main");
    };
    assert!(main.attributes[0].is("__EntryPoint"));
    assert!(main.ret.is_none());
    assert!(matches!(main.body.stmts[0], Stmt::Assign(_)));
    let Stmt::Echo(echo) = &main.body.stmts[2] else {
        panic!("expected echo");
    };
    assert_eq!(echo.args.len(), 2);
    let ExprKind::Call { targs, .. } = &echo.args[0].kind else {
        panic!("expected call");
    };
    assert_eq!(targs[0].name.node, "string");
}

#[test]
fn static_call_with_type_arguments() {
    let expr = parse_expr("C::g<int>(E#A)").expect("expr should parse");
    let ExprKind::StaticCall { class, method, targs, args } = expr.kind else {
        panic!("expected static call");
    };
    assert_eq!(class.node, "C");
    assert_eq!(method.node, "g");
    assert_eq!(targs.len(), 1);
    assert!(matches!(args[0].kind, ExprKind::Label { .. }));
}

#[test]
fn plain_enums_are_rejected() {
    let err = parse_source("enum E: int { A = 1; }").expect_err("expected parse error");
    assert!(err.to_string().contains("only enum classes"));
}

#[test]
fn recovery_reports_every_broken_declaration() {
    let src = r#"<<file: __EnableUnstableFeatures('enum_class')>>
enum class E: mixed { int A = ; }
function f(): void { return 1 }
function ok(): void {}
"#;
    let (program, errors) = parse_source_with_recovery(src).expect("lexing succeeds");
    assert_eq!(errors.len(), 2, "{errors:?}");
    assert_eq!(program.decls.len(), 1);
    assert_eq!(program.decls[0].name().node, "ok");
}
