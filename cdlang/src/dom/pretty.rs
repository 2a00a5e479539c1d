//! Human-readable rendering of a DOM.

use pretty::{Arena, DocAllocator, DocBuilder};

use crate::dom::{CoveredPath, Dom, Instruction, InstructionKind, Protobuf, Scenario, ScenarioKind};

const INDENT: isize = 4;

pub type Doc<'arena> = DocBuilder<'arena, Arena<'arena>>;

pub struct Context<'arena> {
    arena: &'arena Arena<'arena>,
}

impl<'arena> Context<'arena> {
    pub fn new(arena: &'arena Arena<'arena>) -> Context<'arena> {
        Context { arena }
    }

    pub fn dom(&self, dom: &Dom) -> Doc<'arena> {
        let constants = dom.global_constants.values().map(|c| self.instruction(c));
        let scopes = dom.scopes().map(|scenario| self.scenario(scenario));
        let coverage = dom.covered_paths.values().map(|path| self.covered_path(path));

        let items = constants.chain(scopes).chain(coverage);
        self.arena
            .intersperse(items, self.arena.hardline().append(self.arena.hardline()))
    }

    pub fn scenario(&self, scenario: &Scenario) -> Doc<'arena> {
        let keyword = match scenario.kind {
            ScenarioKind::Scenario => "scenario",
            ScenarioKind::SubScenario => "sub_scenario",
        };
        let params = scenario
            .params
            .iter()
            .map(|param| self.arena.text(format!("{}: {}", param.name, param.r#type)));

        let head = self.arena.concat([
            match scenario.disabled {
                true => self.arena.text("disabled "),
                false => self.arena.nil(),
            },
            self.arena.text(keyword),
            self.arena.space(),
            self.arena.text(scenario.name.clone()),
            self.arena.text("("),
            self.arena.intersperse(params, self.arena.text(", ")),
            self.arena.text(")"),
            self.arena.text(" version "),
            self.arena.text(scenario.version.to_string()),
        ]);

        self.block(head, &scenario.children)
    }

    pub fn instruction(&self, instruction: &Instruction) -> Doc<'arena> {
        let id = match instruction.id {
            Some(id) => self.arena.text(format!("{id}: ")),
            None => self.arena.nil(),
        };
        let name = self.arena.text(instruction.name().into_owned());

        let body = match &instruction.kind {
            InstructionKind::Send { channel, protobuf } => self.arena.concat([
                name,
                self.arena.text(format!(" {channel} << ")),
                self.protobuf(protobuf),
            ]),
            InstructionKind::Receive {
                channel,
                protobuf,
                next,
                skip,
            } => self.arena.concat([
                name,
                self.arena.text(format!(" {channel} >> ")),
                self.protobuf(protobuf),
                match next {
                    Some(next) => self.arena.text(format!(" next={next}")),
                    None => self.arena.nil(),
                },
                match skip {
                    true => self.arena.text(" skip"),
                    false => self.arena.nil(),
                },
            ]),
            InstructionKind::Execute { params, .. } => {
                let params = params.iter().map(|param| self.arena.text(param.render()));
                self.arena.concat([
                    self.arena.text("execute "),
                    name,
                    self.arena.text("("),
                    self.arena.intersperse(params, self.arena.text(", ")),
                    self.arena.text(")"),
                ])
            }
            InstructionKind::AnyOrder {
                children,
                children_per_channel,
            } => {
                let channels = children_per_channel.iter().map(|(channel, ids)| {
                    let ids = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>();
                    self.arena.text(format!("{channel}=[{}]", ids.join(",")))
                });
                let head = match children_per_channel.is_empty() {
                    true => name,
                    false => name
                        .append(self.arena.space())
                        .append(self.arena.intersperse(channels, self.arena.space())),
                };
                self.block(head, children)
            }
            InstructionKind::ZeroOrMore { children } | InstructionKind::AtLeastOnce { children } => {
                self.block(name, children)
            }
            InstructionKind::VarDeclaration { variable } => {
                self.arena.text(format!("var {}: {}", variable.name, variable.r#type))
            }
            InstructionKind::OpenStream { channel, .. } | InstructionKind::CloseStream { channel } => {
                name.append(self.arena.text(format!(" {channel}")))
            }
            InstructionKind::Call {
                request,
                response,
                error_expected,
            } => self.arena.concat([
                name,
                self.arena.space(),
                self.protobuf(request),
                self.arena.text(" >> "),
                match (error_expected, response) {
                    (true, _) => self.arena.text("ERROR"),
                    (false, Some(response)) => self.arena.text("OK ").append(self.protobuf(response)),
                    (false, None) => self.arena.text("OK"),
                },
            ]),
            InstructionKind::ConstProto { name, protobuf } => self.arena.concat([
                self.arena.text(format!("const {name} := ")),
                self.protobuf(protobuf),
            ]),
        };

        id.append(body)
    }

    fn protobuf(&self, protobuf: &Protobuf) -> Doc<'arena> {
        let textproto = protobuf.to_textproto();
        let text = match textproto.text.is_empty() {
            true => format!("{} {{ }}", protobuf.type_name),
            false => format!("{} {{ {} }}", protobuf.type_name, textproto.text),
        };
        let serialized = textproto.serialized.iter().map(|field| {
            self.arena.hardline().append(
                self.arena
                    .text(format!("{} = ", field.placeholder))
                    .append(self.protobuf(&field.protobuf)),
            )
        });
        self.arena
            .text(text)
            .append(self.arena.concat(serialized).nest(INDENT))
    }

    /// Every covered path, one block each.
    pub fn coverage(&self, dom: &Dom) -> Doc<'arena> {
        let paths = dom.covered_paths.values().map(|path| self.covered_path(path));
        self.arena.intersperse(paths, self.arena.hardline())
    }

    pub fn covered_path(&self, path: &CoveredPath) -> Doc<'arena> {
        let modes = path.scenarios.iter().map(|(mode, scenarios)| {
            let names = scenarios.iter().cloned().collect::<Vec<_>>();
            self.arena
                .hardline()
                .append(self.arena.text(format!("{mode}: {}", names.join(", "))))
        });

        self.arena.concat([
            self.arena.text(format!("coverage {} {{", path.path)),
            self.arena.concat(modes).nest(INDENT),
            self.arena.hardline(),
            self.arena.text("}"),
        ])
    }

    fn block(&self, head: Doc<'arena>, children: &[Instruction]) -> Doc<'arena> {
        if children.is_empty() {
            return head.append(self.arena.text(" {}"));
        }

        let children = children.iter().map(|child| {
            self.arena.hardline().append(self.instruction(child))
        });
        self.arena.concat([
            head,
            self.arena.text(" {"),
            self.arena.concat(children).nest(INDENT),
            self.arena.hardline(),
            self.arena.text("}"),
        ])
    }
}
