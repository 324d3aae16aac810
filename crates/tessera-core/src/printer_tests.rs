use crate::{
    Attribute, BinaryOp, ClassDecl, EnumDecl, EnumValue, Expr, FieldDecl, FunctionDecl,
    FunctionKey, SourcePrinter, Span, Stmt, TypeDecl, TypeRef,
};

fn ty(name: &str) -> TypeRef {
    name.parse().unwrap()
}

#[test]
fn print_generated_stage_class() {
    let this = || Expr::this(ty("Demo_Pixel"));
    let frag = || Expr::local("tint", ty("Tint"));
    let main = FunctionDecl::new("Main")
        .with_attribute(Attribute::new("EntryPoint"))
        .with_body(vec![
            Stmt::var("tint", ty("Tint"), Some(Expr::construct(ty("Tint"), vec![]))),
            Stmt::expr(Expr::assign(
                frag().field("Color", ty("Real4")),
                this().field("Stage_Color_Real4", ty("Real4")),
            )),
            Stmt::expr(frag().call(
                FunctionKey::new("Tint", "Main", vec![]),
                vec![],
                TypeRef::void(),
            )),
        ]);
    let class = ClassDecl::new("Demo_Pixel")
        .with_attribute(Attribute::new("Pixel"))
        .with_field(
            FieldDecl::new("Stage_Color_Real4", ty("Real4"))
                .with_attribute(Attribute::new("StageInput").with_param("name", "Color".into())),
        )
        .with_function(main);

    insta::assert_snapshot!(SourcePrinter::new().class(&class).dump(), @r#"
    [Pixel]
    struct Demo_Pixel
    {
      [StageInput(name : "Color")] var Stage_Color_Real4 : Real4;

      [EntryPoint]
      function Main()
      {
        var tint = Tint();
        tint.Color = this.Stage_Color_Real4;
        tint.Main();
      }
    }
    "#);
}

#[test]
fn print_control_flow() {
    let i = || Expr::local("i", ty("Integer"));
    let body = vec![
        Stmt::for_loop(
            Stmt::var("i", ty("Integer"), Some(Expr::int(0))),
            Expr::binary(BinaryOp::Lt, i(), Expr::int(3), ty("Boolean")),
            Expr::binary(BinaryOp::AddAssign, i(), Expr::int(1), ty("Integer")),
            vec![Stmt::if_else(
                Expr::binary(BinaryOp::Eq, i(), Expr::int(1), ty("Boolean")),
                vec![Stmt::Continue { span: Span::default() }],
                Some(vec![Stmt::Break { span: Span::default() }]),
            )],
        ),
        Stmt::ret(Some(Expr::real(1.5).cast(ty("Integer")))),
    ];
    let class = ClassDecl::new("Loops").with_function(
        FunctionDecl::new("Run")
            .returns(ty("Integer"))
            .make_static()
            .with_body(body),
    );

    insta::assert_snapshot!(SourcePrinter::new().class(&class).dump(), @r"
    struct Loops
    {
      [Static]
      function Run() : Integer
      {
        for (var i = 0; i < 3; i += 1)
        {
          if (i == 1)
          {
            continue;
          }
          else
          {
            break;
          }
        }
        return 1.5 as Integer;
      }
    }
    ");
}

#[test]
fn print_enum_before_classes() {
    let types = vec![
        TypeDecl::Class(ClassDecl::new("Empty")),
        TypeDecl::Enum(EnumDecl {
            name: "Mode".into(),
            values: vec![
                EnumValue { name: "A".into(), value: 0 },
                EnumValue { name: "B".into(), value: 4 },
            ],
            span: Span::default(),
        }),
    ];

    insta::assert_snapshot!(SourcePrinter::new().types(&types).dump(), @r"
    enum Mode
    {
      A = 0,
      B = 4
    }

    struct Empty
    {
    }
    ");
}
