/// Base instruction sent with every generation. The reference images are always passed
/// in the order face, background, product.
const BASE_TEMPLATE: &str = "Create a photorealistic e-commerce catalog photograph of a model. \
Use the first image for the model's face and identity, the second image as the background \
scene and the third image as the product the model is wearing. Keep the product's colours, \
pattern, fabric and design exactly as shown. Pose: {pose}. Soft natural studio lighting, \
sharp focus, full body in frame, no text, logos or watermarks.";

/// Extra styling instructions keyed by product type name (case-insensitive).
const PRODUCT_TYPE_GUIDANCE: &[(&str, &str)] = &[
    (
        "saree",
        "Drape the saree in the traditional Nivi style with neat front pleats and the pallu falling over the left shoulder.",
    ),
    (
        "lehenga",
        "Show the full flare of the lehenga skirt with the dupatta draped over one shoulder.",
    ),
    (
        "kurti",
        "Show the kurti at its full length with the side slits and sleeve details visible.",
    ),
    (
        "kurta",
        "Show the kurta at its full length with the neckline and sleeve details visible.",
    ),
    (
        "dress",
        "Let the dress fall naturally so its silhouette and hemline are clearly visible.",
    ),
];

/// Builds the generation prompt. Same inputs always give the same prompt.
pub fn build_prompt(pose_description: &str, product_type_name: &str) -> String {
    let mut prompt = BASE_TEMPLATE.replace("{pose}", pose_description.trim());

    if let Some(guidance) = guidance_for(product_type_name) {
        prompt.push(' ');
        prompt.push_str(guidance);
    }

    prompt
}

fn guidance_for(product_type_name: &str) -> Option<&'static str> {
    let key = product_type_name.trim();

    PRODUCT_TYPE_GUIDANCE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, guidance)| *guidance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_description_is_substituted() {
        let prompt = build_prompt("  sitting cross-legged on a stool ", "Shirt");

        assert!(prompt.contains("Pose: sitting cross-legged on a stool."));
        assert!(!prompt.contains("{pose}"));
    }

    #[test]
    fn known_product_type_appends_guidance() {
        let prompt = build_prompt("standing", " SAREE ");

        assert!(prompt.ends_with("pallu falling over the left shoulder."));
    }

    #[test]
    fn unknown_product_type_gets_base_prompt_only() {
        let prompt = build_prompt("standing", "Sneakers");

        assert!(prompt.ends_with("no text, logos or watermarks."));
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(build_prompt("walking", "Lehenga"), build_prompt("walking", "Lehenga"));
    }
}
