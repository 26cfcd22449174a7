//! `propdesk templates`: Show every task kind and its rendered prompt.

use propdesk_assistant::PromptRegistry;

use super::parse_input;

pub fn run(input: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let registry = PromptRegistry::standard();
    let input = parse_input(input.as_deref());

    println!("📝 Prompt templates\n");
    for kind in registry.kinds() {
        let prompt = registry.render(kind, &input)?;
        println!("  {kind}");
        println!("    {prompt}\n");
    }

    Ok(())
}
