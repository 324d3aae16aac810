use indoc::indoc;

use crate::{
    AttributeList, AttributeValue, BinaryOp, ExprKind, Literal, MemberKind, Project, Stmt,
    TypeDecl, TypeRef,
};

const FIXTURE: &str = indoc! {r#"
    {
      "name": "Demo",
      "sources": [{
        "origin": "Tint.tess",
        "code": "",
        "user_data": { "id": 7 },
        "types": [
          { "decl": "enum", "name": "Mode", "values": [{ "name": "Add", "value": 1 }] },
          {
            "decl": "class",
            "name": "Tint",
            "attributes": [{ "name": "Pixel" }],
            "fields": [
              {
                "name": "Color",
                "ty": "Real4",
                "attributes": [
                  { "name": "Input", "params": [{ "name": "name", "value": "Albedo" }] }
                ]
              }
            ],
            "functions": [{
              "name": "Main",
              "body": [
                { "stmt": "expr", "expr": {
                    "expr": "binary", "op": "*=", "ty": "Real4",
                    "lhs": { "expr": "member", "name": "Color", "ty": "Real4",
                             "target": { "expr": "this", "ty": "Tint" } },
                    "rhs": { "expr": "literal", "value": 0.5, "ty": "Real" }
                } },
                { "stmt": "return" }
              ]
            }]
          }
        ]
      }]
    }
"#};

#[test]
fn deserialize_project_fixture() {
    let project: Project = serde_json::from_str(FIXTURE).unwrap();

    assert_eq!(project.name, "Demo");
    assert_eq!(project.sources[0].user_data, Some(serde_json::json!({ "id": 7 })));
    assert!(matches!(project.sources[0].types[0], TypeDecl::Enum(_)));

    let class = project.find_class("Tint").unwrap();
    assert!(class.attributes.has_attribute("Pixel"));

    let field = class.find_field("Color").unwrap();
    assert_eq!(field.ty, TypeRef::named("Real4"));
    let input = field.attributes.find_attribute("Input").unwrap();
    assert_eq!(input.string_param("name"), Some("Albedo"));

    let main = class.find_function("Main").unwrap();
    assert!(main.return_type.is_void());
    let Stmt::Expr { expr, .. } = &main.body[0] else {
        panic!("expected expression statement");
    };
    let ExprKind::Binary { op, lhs, rhs } = &expr.kind else {
        panic!("expected binary expression");
    };
    assert_eq!(*op, BinaryOp::MulAssign);
    assert!(matches!(
        lhs.kind,
        ExprKind::Member {
            kind: MemberKind::Field,
            ..
        }
    ));
    assert!(matches!(
        rhs.kind,
        ExprKind::Literal {
            value: Literal::Real(v)
        } if v == 0.5
    ));
    assert!(matches!(main.body[1], Stmt::Return { value: None, .. }));
}

#[test]
fn attribute_params_by_name_or_position() {
    let attr = crate::Attribute::new("Geometry").with_positional(AttributeValue::Int(3));
    assert_eq!(attr.int_param("maxVertices", 0), Some(3));

    let attr = crate::Attribute::new("Geometry").with_param("maxVertices", 6i64.into());
    assert_eq!(attr.int_param("maxVertices", 0), Some(6));
    assert_eq!(attr.int_param("other", 1), None);
}

#[test]
fn compound_assignment_base() {
    assert_eq!(BinaryOp::AddAssign.compound_base(), Some(BinaryOp::Add));
    assert!(BinaryOp::Assign.is_assignment());
    assert!(!BinaryOp::Add.is_assignment());
    assert_eq!(BinaryOp::Assign.compound_base(), None);
}
