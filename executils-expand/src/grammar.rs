use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "expand.pest"]
pub struct ExpandParser;
