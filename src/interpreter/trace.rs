/// Append-only TAC accumulator.
///
/// One line per elaborated operation, interleaved with execution in
/// emission order. The trace is a display artifact and is never executed;
/// on error the whole accumulator is dropped with the run.
pub(super) struct Tac {
    text: String,
    temps: usize,
}

impl Tac {
    pub(super) fn new() -> Self {
        Self {
            text: String::new(),
            temps: 0,
        }
    }

    /// `t<n> = <substituted expression>` for one evaluator invocation.
    pub(super) fn temp(&mut self, rendered: &str) {
        let number = self.temps;
        self.temps += 1;
        self.push_line(&format!("t{number} = {rendered}"));
    }

    pub(super) fn assign(&mut self, name: &str, expr: &str) {
        self.push_line(&format!("{name} = {expr}"));
    }

    pub(super) fn print(&mut self, expr: &str) {
        self.push_line(&format!("print {expr}"));
    }

    pub(super) fn function(&mut self, name: &str, params: &[String]) {
        self.push_line(&format!("function {name}({})", params.join(", ")));
    }

    pub(super) fn branch(&mut self, condition: &str, exit_line: usize) {
        self.push_line(&format!("if {condition} goto block_{exit_line}"));
    }

    pub(super) fn loop_header(&mut self, condition: &str) {
        self.push_line(&format!("while {condition}"));
    }

    pub(super) fn into_text(self) -> String {
        self.text
    }

    fn push_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }
}
