//! Abstract Syntax Tree (AST) definitions for JavaScript.
//!
//! These structures are designed to be ESTree-compatible where possible.
//! Every node carries a [`Span`] so that analyses can report locations and
//! codemods can splice replacement text into the original source.

mod visit;

pub use visit::{Nesting, Visitor, walk_class, walk_expression, walk_function, walk_pattern, walk_statement};

use crate::lexer::Span;

/// Whether a program was parsed with the script or the module goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    /// Classic script (CommonJS bodies are scripts)
    Script,
    /// ECMAScript module (import/export allowed)
    Module,
}

/// A complete JavaScript program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The statements in the program
    pub body: Vec<Statement>,
    /// The goal symbol used to parse
    pub source_type: SourceType,
    /// Span of the whole program
    pub span: Span,
}

/// An identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
    /// Location of the identifier
    pub span: Span,
}

/// A string literal with its location, used for module specifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    /// The cooked value
    pub value: String,
    /// Location including quotes
    pub span: Span,
}

/// A JavaScript statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration (var, let, const)
    VariableDeclaration(VariableDeclaration),
    /// Function declaration
    FunctionDeclaration(Function),
    /// Class declaration
    ClassDeclaration(Class),
    /// Expression statement
    Expression(ExpressionStatement),
    /// Block statement { ... }
    Block(BlockStatement),
    /// If statement
    If(IfStatement),
    /// Switch statement
    Switch(SwitchStatement),
    /// While statement
    While(WhileStatement),
    /// Do-while statement
    DoWhile(DoWhileStatement),
    /// For statement
    For(ForStatement),
    /// For-in statement
    ForIn(ForInStatement),
    /// For-of statement
    ForOf(ForOfStatement),
    /// Return statement
    Return(ReturnStatement),
    /// Break statement with optional label
    Break(JumpStatement),
    /// Continue statement with optional label
    Continue(JumpStatement),
    /// Throw statement
    Throw(ThrowStatement),
    /// Try statement
    Try(TryStatement),
    /// With statement
    With(WithStatement),
    /// Labeled statement
    Labeled(LabeledStatement),
    /// Import declaration (module goal only)
    Import(ImportDeclaration),
    /// Export declaration (module goal only)
    Export(ExportDeclaration),
    /// Debugger statement
    Debugger(Span),
    /// Empty statement (;)
    Empty(Span),
}

impl Statement {
    /// Returns the source span of this statement.
    pub fn span(&self) -> Span {
        match self {
            Statement::VariableDeclaration(s) => s.span,
            Statement::FunctionDeclaration(s) => s.span,
            Statement::ClassDeclaration(s) => s.span,
            Statement::Expression(s) => s.span,
            Statement::Block(s) => s.span,
            Statement::If(s) => s.span,
            Statement::Switch(s) => s.span,
            Statement::While(s) => s.span,
            Statement::DoWhile(s) => s.span,
            Statement::For(s) => s.span,
            Statement::ForIn(s) => s.span,
            Statement::ForOf(s) => s.span,
            Statement::Return(s) => s.span,
            Statement::Break(s) | Statement::Continue(s) => s.span,
            Statement::Throw(s) => s.span,
            Statement::Try(s) => s.span,
            Statement::With(s) => s.span,
            Statement::Labeled(s) => s.span,
            Statement::Import(s) => s.span,
            Statement::Export(s) => s.span(),
            Statement::Debugger(span) | Statement::Empty(span) => *span,
        }
    }
}

/// Variable declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// var declaration
    Var,
    /// let declaration
    Let,
    /// const declaration
    Const,
}

impl VariableKind {
    /// The keyword spelling of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableKind::Var => "var",
            VariableKind::Let => "let",
            VariableKind::Const => "const",
        }
    }
}

/// A variable declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    /// The kind of declaration
    pub kind: VariableKind,
    /// The declarators
    pub declarations: Vec<VariableDeclarator>,
    /// Location, including the trailing semicolon when present
    pub span: Span,
}

/// A single variable declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// The binding target
    pub id: Pattern,
    /// Optional initializer expression
    pub init: Option<Expression>,
    /// Location
    pub span: Span,
}

/// A binding pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Plain identifier binding
    Identifier(Identifier),
    /// `{ a, b: c, ...rest }`
    Object(ObjectPattern),
    /// `[a, , b, ...rest]`
    Array(ArrayPattern),
    /// `target = default`
    Assignment(AssignmentPattern),
    /// `...target`
    Rest(RestElement),
}

impl Pattern {
    /// Returns the source span of this pattern.
    pub fn span(&self) -> Span {
        match self {
            Pattern::Identifier(id) => id.span,
            Pattern::Object(p) => p.span,
            Pattern::Array(p) => p.span,
            Pattern::Assignment(p) => p.span,
            Pattern::Rest(p) => p.span,
        }
    }

    /// Returns the identifier if this is a plain identifier binding.
    pub fn as_identifier(&self) -> Option<&Identifier> {
        match self {
            Pattern::Identifier(id) => Some(id),
            _ => None,
        }
    }

    /// Collects every name bound by this pattern.
    pub fn bound_names<'p>(&'p self, names: &mut Vec<&'p str>) {
        match self {
            Pattern::Identifier(id) => names.push(&id.name),
            Pattern::Object(obj) => {
                for prop in &obj.properties {
                    prop.value.bound_names(names);
                }
                if let Some(rest) = &obj.rest {
                    rest.bound_names(names);
                }
            }
            Pattern::Array(arr) => {
                for element in arr.elements.iter().flatten() {
                    element.bound_names(names);
                }
            }
            Pattern::Assignment(p) => p.left.bound_names(names),
            Pattern::Rest(p) => p.argument.bound_names(names),
        }
    }
}

/// An object destructuring pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPattern {
    /// Key/value properties
    pub properties: Vec<ObjectPatternProperty>,
    /// Trailing `...rest`
    pub rest: Option<Box<Pattern>>,
    /// Location
    pub span: Span,
}

/// One `key: value` entry of an object pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatternProperty {
    /// The property read from the source object
    pub key: PropertyKey,
    /// The binding target
    pub value: Pattern,
    /// Whether written as `{ a }`
    pub shorthand: bool,
    /// Location
    pub span: Span,
}

/// An array destructuring pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayPattern {
    /// Elements, `None` for holes
    pub elements: Vec<Option<Pattern>>,
    /// Location
    pub span: Span,
}

/// A pattern with a default value.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentPattern {
    /// The binding target
    pub left: Box<Pattern>,
    /// The default
    pub right: Box<Expression>,
    /// Location
    pub span: Span,
}

/// A rest element in a pattern or parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct RestElement {
    /// The binding target
    pub argument: Box<Pattern>,
    /// Location
    pub span: Span,
}

/// A function declaration, expression or method body.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// The function name
    pub id: Option<Identifier>,
    /// The parameters
    pub params: Vec<Pattern>,
    /// The function body
    pub body: Vec<Statement>,
    /// Whether this is an async function
    pub is_async: bool,
    /// Whether this is a generator function
    pub is_generator: bool,
    /// Location
    pub span: Span,
}

/// A class declaration or expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    /// The class name
    pub id: Option<Identifier>,
    /// The `extends` clause
    pub super_class: Option<Box<Expression>>,
    /// Class elements
    pub body: Vec<ClassMember>,
    /// Location
    pub span: Span,
}

/// A class element.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    /// Method, getter, setter or constructor
    Method(MethodDefinition),
    /// Field with optional initializer
    Field(FieldDefinition),
    /// `static { ... }`
    StaticBlock(BlockStatement),
}

/// Kind of a class or object method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// `constructor() {}`
    Constructor,
    /// Plain method
    Method,
    /// `get x() {}`
    Get,
    /// `set x(v) {}`
    Set,
}

/// A class method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDefinition {
    /// Method key
    pub key: PropertyKey,
    /// Method kind
    pub kind: MethodKind,
    /// Method body
    pub function: Function,
    /// Whether declared `static`
    pub is_static: bool,
    /// Location
    pub span: Span,
}

/// A class field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    /// Field key
    pub key: PropertyKey,
    /// Initializer
    pub value: Option<Expression>,
    /// Whether declared `static`
    pub is_static: bool,
    /// Location
    pub span: Span,
}

/// An expression statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    /// The expression
    pub expression: Expression,
    /// Location, including the trailing semicolon when present
    pub span: Span,
}

/// A block statement.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    /// The statements in the block
    pub body: Vec<Statement>,
    /// Location
    pub span: Span,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// The condition
    pub test: Expression,
    /// The then branch
    pub consequent: Box<Statement>,
    /// The optional else branch
    pub alternate: Option<Box<Statement>>,
    /// Location
    pub span: Span,
}

/// A while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    /// The condition
    pub test: Expression,
    /// The loop body
    pub body: Box<Statement>,
    /// Location
    pub span: Span,
}

/// A for statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    /// The initializer
    pub init: Option<ForInit>,
    /// The condition
    pub test: Option<Expression>,
    /// The update expression
    pub update: Option<Expression>,
    /// The loop body
    pub body: Box<Statement>,
    /// Location
    pub span: Span,
}

/// For loop initializer.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    /// Variable declaration
    Declaration(VariableDeclaration),
    /// Expression
    Expression(Expression),
}

/// A switch statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStatement {
    /// The discriminant expression
    pub discriminant: Expression,
    /// The case clauses
    pub cases: Vec<SwitchCase>,
    /// Location
    pub span: Span,
}

/// A switch case clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// The test expression (None for default)
    pub test: Option<Expression>,
    /// The consequent statements
    pub consequent: Vec<Statement>,
    /// Location
    pub span: Span,
}

/// A do-while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStatement {
    /// The loop body
    pub body: Box<Statement>,
    /// The condition
    pub test: Expression,
    /// Location
    pub span: Span,
}

/// A for-in statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForInStatement {
    /// The left-hand side
    pub left: ForInLeft,
    /// The object to iterate over
    pub right: Expression,
    /// The loop body
    pub body: Box<Statement>,
    /// Location
    pub span: Span,
}

/// A for-of statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForOfStatement {
    /// The left-hand side
    pub left: ForInLeft,
    /// The iterable
    pub right: Expression,
    /// The loop body
    pub body: Box<Statement>,
    /// Whether this is a `for await`
    pub is_await: bool,
    /// Location
    pub span: Span,
}

/// Left-hand side of for-in/for-of.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInLeft {
    /// Variable declaration
    Declaration(VariableDeclaration),
    /// Assignment target expression
    Expression(Expression),
}

/// A return statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    /// The return value
    pub argument: Option<Expression>,
    /// Location
    pub span: Span,
}

/// A break or continue statement.
#[derive(Debug, Clone, PartialEq)]
pub struct JumpStatement {
    /// Optional target label
    pub label: Option<Identifier>,
    /// Location
    pub span: Span,
}

/// A throw statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrowStatement {
    /// The thrown expression
    pub argument: Expression,
    /// Location
    pub span: Span,
}

/// A try statement.
#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    /// The try block
    pub block: BlockStatement,
    /// The catch clause
    pub handler: Option<CatchClause>,
    /// The finally block
    pub finalizer: Option<BlockStatement>,
    /// Location
    pub span: Span,
}

/// A catch clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// The error binding
    pub param: Option<Pattern>,
    /// The catch body
    pub body: BlockStatement,
    /// Location
    pub span: Span,
}

/// A with statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WithStatement {
    /// The object expression
    pub object: Expression,
    /// The body statement
    pub body: Box<Statement>,
    /// Location
    pub span: Span,
}

/// A labeled statement.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledStatement {
    /// The label identifier
    pub label: Identifier,
    /// The labeled body
    pub body: Box<Statement>,
    /// Location
    pub span: Span,
}

/// A name on either side of `as` in import/export lists. String names
/// (`export { x as 'module.exports' }`) are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleExportName {
    /// The name
    pub name: String,
    /// Whether written as a string literal
    pub is_string: bool,
    /// Location
    pub span: Span,
}

/// `import ... from 'source'`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDeclaration {
    /// Bindings introduced (empty for side-effect imports)
    pub specifiers: Vec<ImportSpecifier>,
    /// Module specifier
    pub source: StringLiteral,
    /// Location
    pub span: Span,
}

/// One binding of an import declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    /// `import foo from 'm'`
    Default(Identifier),
    /// `import * as ns from 'm'`
    Namespace(Identifier),
    /// `import { imported as local } from 'm'`
    Named {
        /// Exported name in the source module
        imported: ModuleExportName,
        /// Local binding
        local: Identifier,
    },
}

/// An export declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportDeclaration {
    /// `export { a, b as c }` or `export { a } from 'm'`
    Named(ExportNamed),
    /// `export const x = ...`, `export function f() {}`, `export class C {}`
    Declaration(ExportDecl),
    /// `export default ...`
    Default(ExportDefault),
    /// `export * from 'm'` / `export * as ns from 'm'`
    All(ExportAll),
}

impl ExportDeclaration {
    /// Returns the source span of this declaration.
    pub fn span(&self) -> Span {
        match self {
            ExportDeclaration::Named(e) => e.span,
            ExportDeclaration::Declaration(e) => e.span,
            ExportDeclaration::Default(e) => e.span,
            ExportDeclaration::All(e) => e.span,
        }
    }
}

/// `export { ... } [from '...']`
#[derive(Debug, Clone, PartialEq)]
pub struct ExportNamed {
    /// The export list
    pub specifiers: Vec<ExportSpecifier>,
    /// Re-export source
    pub source: Option<StringLiteral>,
    /// Location
    pub span: Span,
}

/// `local as exported`
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
    /// Local (or imported, for re-exports) name
    pub local: ModuleExportName,
    /// Exported name
    pub exported: ModuleExportName,
    /// Location
    pub span: Span,
}

/// `export <declaration>`
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDecl {
    /// The exported declaration
    pub declaration: Box<Statement>,
    /// Location
    pub span: Span,
}

/// `export default ...`
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDefault {
    /// What is exported
    pub declaration: ExportDefaultKind,
    /// Location
    pub span: Span,
}

/// The operand of `export default`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportDefaultKind {
    /// `export default function ...`
    Function(Function),
    /// `export default class ...`
    Class(Class),
    /// `export default <expr>`
    Expression(Expression),
}

/// `export * [as name] from 'source'`
#[derive(Debug, Clone, PartialEq)]
pub struct ExportAll {
    /// Namespace name for `export * as name`
    pub exported: Option<ModuleExportName>,
    /// Source module
    pub source: StringLiteral,
    /// Location
    pub span: Span,
}

/// A JavaScript expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(LiteralExpression),
    /// Identifier reference
    Identifier(Identifier),
    /// this keyword
    This(Span),
    /// super keyword
    Super(Span),
    /// Array literal
    Array(ArrayExpression),
    /// Object literal
    Object(ObjectExpression),
    /// Binary or logical expression
    Binary(BinaryExpression),
    /// Unary expression
    Unary(UnaryExpression),
    /// Assignment expression
    Assignment(AssignmentExpression),
    /// Call expression
    Call(CallExpression),
    /// Member access expression
    Member(MemberExpression),
    /// Conditional (ternary) expression
    Conditional(ConditionalExpression),
    /// Function expression
    Function(Function),
    /// Arrow function expression
    Arrow(ArrowFunctionExpression),
    /// Class expression
    Class(Class),
    /// new expression
    New(NewExpression),
    /// Update expression (++/--)
    Update(UpdateExpression),
    /// Sequence expression (comma operator)
    Sequence(SequenceExpression),
    /// Template literal
    Template(TemplateLiteral),
    /// Tagged template
    TaggedTemplate(TaggedTemplateExpression),
    /// Spread element in array literals, call arguments and object literals
    Spread(SpreadElement),
    /// yield expression
    Yield(YieldExpression),
    /// await expression
    Await(AwaitExpression),
    /// Dynamic `import(source)`
    Import(ImportCall),
    /// `import.meta` / `new.target`
    MetaProperty(MetaProperty),
}

impl Expression {
    /// Returns the source span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expression::Literal(e) => e.span,
            Expression::Identifier(e) => e.span,
            Expression::This(span) | Expression::Super(span) => *span,
            Expression::Array(e) => e.span,
            Expression::Object(e) => e.span,
            Expression::Binary(e) => e.span,
            Expression::Unary(e) => e.span,
            Expression::Assignment(e) => e.span,
            Expression::Call(e) => e.span,
            Expression::Member(e) => e.span,
            Expression::Conditional(e) => e.span,
            Expression::Function(e) => e.span,
            Expression::Arrow(e) => e.span,
            Expression::Class(e) => e.span,
            Expression::New(e) => e.span,
            Expression::Update(e) => e.span,
            Expression::Sequence(e) => e.span,
            Expression::Template(e) => e.span,
            Expression::TaggedTemplate(e) => e.span,
            Expression::Spread(e) => e.span,
            Expression::Yield(e) => e.span,
            Expression::Await(e) => e.span,
            Expression::Import(e) => e.span,
            Expression::MetaProperty(e) => e.span,
        }
    }

    /// Returns the identifier name if this is a bare identifier reference.
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Expression::Identifier(id) => Some(&id.name),
            _ => None,
        }
    }

    /// Returns the string value if this is a string literal.
    pub fn as_string_literal(&self) -> Option<&str> {
        match self {
            Expression::Literal(LiteralExpression {
                value: Literal::String(s),
                ..
            }) => Some(s),
            _ => None,
        }
    }
}

/// A literal value with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpression {
    /// The value
    pub value: Literal,
    /// Location
    pub span: Span,
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// null literal
    Null,
    /// BigInt literal
    BigInt(String),
    /// Regular expression literal
    RegExp { pattern: String, flags: String },
}

/// An array expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpression {
    /// The elements (None represents a hole)
    pub elements: Vec<Option<Expression>>,
    /// Location
    pub span: Span,
}

/// An object expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectExpression {
    /// The members
    pub properties: Vec<ObjectMember>,
    /// Location
    pub span: Span,
}

/// A member of an object literal.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectMember {
    /// `key: value`, shorthand, method or accessor
    Property(Property),
    /// `...expr`
    Spread(SpreadElement),
}

/// How an object property was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// `key: value` or shorthand
    Init,
    /// `key() {}`
    Method,
    /// `get key() {}`
    Get,
    /// `set key(v) {}`
    Set,
}

/// An object property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// The property key
    pub key: PropertyKey,
    /// The property value (function expression for methods/accessors)
    pub value: Expression,
    /// How the property was written
    pub kind: PropertyKind,
    /// Whether this is shorthand syntax
    pub shorthand: bool,
    /// Location
    pub span: Span,
}

/// A property key.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    /// Identifier key (keywords allowed)
    Identifier(Identifier),
    /// String or numeric key
    Literal(LiteralExpression),
    /// Computed key
    Computed(Box<Expression>),
    /// `#private` class key
    Private(Identifier),
}

impl PropertyKey {
    /// Returns the key as a static property name, if it is not computed.
    pub fn static_name(&self) -> Option<String> {
        match self {
            PropertyKey::Identifier(id) => Some(id.name.clone()),
            PropertyKey::Literal(lit) => match &lit.value {
                Literal::String(s) => Some(s.clone()),
                Literal::Number(n) => Some(format_number(*n)),
                _ => None,
            },
            PropertyKey::Computed(expr) => expr.as_string_literal().map(str::to_string),
            PropertyKey::Private(_) => None,
        }
    }

    /// Returns the source span of the key.
    pub fn span(&self) -> Span {
        match self {
            PropertyKey::Identifier(id) | PropertyKey::Private(id) => id.span,
            PropertyKey::Literal(lit) => lit.span,
            PropertyKey::Computed(expr) => expr.span(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// A binary or logical expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand
    pub right: Box<Expression>,
    /// Location
    pub span: Span,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Exponent,
    // Comparison
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    // Logical
    LogicalAnd,
    LogicalOr,
    NullishCoalescing,
    // Bitwise
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    // Other
    In,
    InstanceOf,
}

impl BinaryOperator {
    /// Returns true for short-circuiting operators, whose right operand
    /// only runs conditionally.
    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr | BinaryOperator::NullishCoalescing
        )
    }
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
    /// Location
    pub span: Span,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    LogicalNot,
    /// ~
    BitwiseNot,
    /// typeof
    Typeof,
    /// void
    Void,
    /// delete
    Delete,
}

/// An assignment expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    /// The operator
    pub operator: AssignmentOperator,
    /// The left-hand side
    pub left: Box<Expression>,
    /// The right-hand side
    pub right: Box<Expression>,
    /// Location
    pub span: Span,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
    ExponentAssign,
    LeftShiftAssign,
    RightShiftAssign,
    UnsignedRightShiftAssign,
    BitwiseAndAssign,
    BitwiseOrAssign,
    BitwiseXorAssign,
    LogicalAndAssign,
    LogicalOrAssign,
    NullishCoalescingAssign,
}

/// A function call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The function being called
    pub callee: Box<Expression>,
    /// The arguments
    pub arguments: Vec<Expression>,
    /// Whether called through `?.()`
    pub optional: bool,
    /// Location
    pub span: Span,
}

/// A member access expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    /// The object
    pub object: Box<Expression>,
    /// The property
    pub property: MemberProperty,
    /// Whether accessed through `?.`
    pub optional: bool,
    /// Location
    pub span: Span,
}

impl MemberExpression {
    /// Returns the accessed property name when it is statically known
    /// (`a.b`, `a['b']`).
    pub fn static_property(&self) -> Option<&str> {
        match &self.property {
            MemberProperty::Identifier(id) => Some(&id.name),
            MemberProperty::Expression(expr) => expr.as_string_literal(),
            MemberProperty::Private(_) => None,
        }
    }

    /// Whether the property is written in bracket notation.
    pub fn is_computed(&self) -> bool {
        matches!(self.property, MemberProperty::Expression(_))
    }
}

/// Member property.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    /// Identifier property
    Identifier(Identifier),
    /// `#private` property
    Private(Identifier),
    /// Computed property expression
    Expression(Box<Expression>),
}

/// A conditional (ternary) expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    /// The condition
    pub test: Box<Expression>,
    /// The consequent (if true)
    pub consequent: Box<Expression>,
    /// The alternate (if false)
    pub alternate: Box<Expression>,
    /// Location
    pub span: Span,
}

/// An arrow function expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunctionExpression {
    /// Parameters
    pub params: Vec<Pattern>,
    /// Body (expression or block)
    pub body: ArrowBody,
    /// Whether async
    pub is_async: bool,
    /// Location
    pub span: Span,
}

/// Arrow function body.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    /// Expression body
    Expression(Box<Expression>),
    /// Block body
    Block(Vec<Statement>),
}

/// A new expression.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpression {
    /// The constructor
    pub callee: Box<Expression>,
    /// The arguments
    pub arguments: Vec<Expression>,
    /// Location
    pub span: Span,
}

/// An update expression (++/--)
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    /// The operator
    pub operator: UpdateOperator,
    /// The operand
    pub argument: Box<Expression>,
    /// Whether prefix (++x) or postfix (x++)
    pub prefix: bool,
    /// Location
    pub span: Span,
}

/// Update operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    /// ++
    Increment,
    /// --
    Decrement,
}

/// A sequence expression (comma operator).
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceExpression {
    /// The expressions
    pub expressions: Vec<Expression>,
    /// Location
    pub span: Span,
}

/// A template literal. Substitutions are kept as raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLiteral {
    /// Raw text between the backticks
    pub raw: String,
    /// Location
    pub span: Span,
}

/// A tagged template (`tag\`...\``).
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedTemplateExpression {
    /// The tag function
    pub tag: Box<Expression>,
    /// The template
    pub quasi: TemplateLiteral,
    /// Location
    pub span: Span,
}

/// `...argument`
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadElement {
    /// The spread operand
    pub argument: Box<Expression>,
    /// Location
    pub span: Span,
}

/// `yield` / `yield*`
#[derive(Debug, Clone, PartialEq)]
pub struct YieldExpression {
    /// The yielded value
    pub argument: Option<Box<Expression>>,
    /// Whether `yield*`
    pub delegate: bool,
    /// Location
    pub span: Span,
}

/// `await argument`
#[derive(Debug, Clone, PartialEq)]
pub struct AwaitExpression {
    /// The awaited value
    pub argument: Box<Expression>,
    /// Location
    pub span: Span,
}

/// Dynamic `import(source)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportCall {
    /// The specifier expression
    pub source: Box<Expression>,
    /// Location
    pub span: Span,
}

/// `import.meta` or `new.target`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaProperty {
    /// `import` or `new`
    pub meta: Identifier,
    /// `meta` or `target`
    pub property: Identifier,
    /// Location
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Identifier {
        Identifier {
            name: name.to_string(),
            span: Span::default(),
        }
    }

    #[test]
    fn test_property_key_static_name() {
        assert_eq!(PropertyKey::Identifier(ident("foo")).static_name().as_deref(), Some("foo"));
        let numeric = PropertyKey::Literal(LiteralExpression {
            value: Literal::Number(3.0),
            span: Span::default(),
        });
        assert_eq!(numeric.static_name().as_deref(), Some("3"));
        let computed = PropertyKey::Computed(Box::new(Expression::Identifier(ident("k"))));
        assert_eq!(computed.static_name(), None);
    }

    #[test]
    fn test_pattern_bound_names() {
        let pattern = Pattern::Object(ObjectPattern {
            properties: vec![ObjectPatternProperty {
                key: PropertyKey::Identifier(ident("a")),
                value: Pattern::Assignment(AssignmentPattern {
                    left: Box::new(Pattern::Identifier(ident("b"))),
                    right: Box::new(Expression::This(Span::default())),
                    span: Span::default(),
                }),
                shorthand: false,
                span: Span::default(),
            }],
            rest: Some(Box::new(Pattern::Identifier(ident("rest")))),
            span: Span::default(),
        });
        let mut names = Vec::new();
        pattern.bound_names(&mut names);
        assert_eq!(names, vec!["b", "rest"]);
    }

    #[test]
    fn test_logical_operators() {
        assert!(BinaryOperator::NullishCoalescing.is_logical());
        assert!(!BinaryOperator::In.is_logical());
    }
}
