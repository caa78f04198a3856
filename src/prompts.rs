//! Prompts for the script and image-prompt requests, plus the style suffixes.
//!
//! Centralising every prompt here keeps prompt wording out of the stage code
//! and lets unit tests inspect the exact text sent to the model.
//!
//! The script markup (`# 페이지 제목:` / `## 페이지 스크립트:`) is part of the
//! output contract: downstream readers such as [`crate::output::Script::pages`]
//! look for these markers.

/// Title marker that opens each page unit of a script.
pub const PAGE_TITLE_MARKER: &str = "# 페이지 제목:";

/// Body marker that follows each page title.
pub const PAGE_SCRIPT_MARKER: &str = "## 페이지 스크립트:";

/// System prompt for the blog-script request.
pub const SCRIPT_SYSTEM_PROMPT: &str = "당신은 블로그 제작 전문가입니다.";

/// System prompt for the image-prompt request.
pub const IMAGE_PROMPT_SYSTEM_PROMPT: &str = "당신은 안전하고 정교하며 사실적인 이미지 생성 프롬프트를 작성하는 전문가입니다. 항상 유효한 JSON 형식으로 응답하세요.";

/// Placeholder used whenever no usable prompt could be recovered.
pub const FALLBACK_PROMPT: &str = "실사 스타일의 사실적인 장면";

/// Second placeholder used when the model's JSON could not be decoded.
pub const FALLBACK_PROMPT_DETAILED: &str = "사실적이며 정교한 장면";

/// Build the user message asking for a paged blog script.
pub fn script_request(text: &str, target_length: usize) -> String {
    format!(
        r#"다음 문서의 내용을 바탕으로 약 {target_length}자 내외의 블로그 페이지 제작을 위한 스크립트를 작성해 주세요.
각 페이지별로 아래 형식을 따라주세요:

{PAGE_TITLE_MARKER} [제목]

{PAGE_SCRIPT_MARKER}
[상세 설명 스크립트]

각 페이지별로 고객 대상으로 친절한 어투로 자세한 설명을 제공해 주세요.

문서 내용:
{text}"#
    )
}

/// Build the user message asking for one image prompt per page, as JSON.
pub fn image_prompt_request(script: &str, max_scenes: usize) -> String {
    format!(
        r#"아래 블로그 페이지의 스크립트를 분석하여,
각 페이지를 초고화질 실사 사진처럼 표현할 수 있는 세부적이고 자세한 이미지 생성 프롬프트를 만들어 주세요.

프롬프트는 다음과 같은 요소를 포함해야 합니다:
1. 주요 피사체의 명확한 설명 (인물, 제품, 환경 등)
2. 조명 조건 (자연광, 부드러운 조명, 극적인 조명 등)
3. 촬영 각도 및 구도 (클로즈업, 전체 샷, 원근감 등)
4. 색감 및 분위기 (밝고 활기찬, 차분하고 따뜻한 등)
5. 고급 사진 효과 (얕은 심도, 선명한 디테일, 부드러운 배경 등)

결과는 반드시 유효한 JSON 형식의 리스트로 반환해주세요. 예:
[
  "첫 번째 페이지를 위한 상세한 이미지 프롬프트",
  "두 번째 페이지를 위한 상세한 이미지 프롬프트"
]
장면을 {max_scenes}개로 제한해 주세요.

스크립트:
{script}"#
    )
}

// ── Style suffixes ───────────────────────────────────────────────────────
//
// Appended verbatim (leading space included) to each prompt.

pub const STYLE_PHOTOREALISTIC: &str = " Create a hyper-realistic photograph with extreme detail. Use professional photography techniques with natural lighting, perfect focus, and authentic textures. The image should look indistinguishable from a high-end camera photo with 8K resolution. Include subtle details like skin pores, fabric texture, or surface reflections where appropriate. Use photorealistic color grading with naturalistic environment.";

pub const STYLE_STORYBOOK: &str = " in a soft, illustrated storybook style, warm and cozy colors.";

pub const STYLE_WATERCOLOR: &str =
    " as a delicate watercolor painting with soft colors and gentle brushstrokes.";

pub const STYLE_3D_RENDER: &str =
    " as a colorful 3D rendered scene with soft lighting and gentle shadows.";

pub const STYLE_ILLUSTRATION: &str =
    " as a clean, modern illustration with vibrant colors and simple shapes.";
