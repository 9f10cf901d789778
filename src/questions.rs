//! Question pools used when the engine issues prompts.

use rand::seq::SliceRandom;

use crate::budget::QuestionCategory;

pub const INTUITION_QUESTIONS: [&str; 5] = [
    "Какое твое любимое место в городе?",
    "Что тебя вдохновляет?",
    "Какая твоя мечта?",
    "Что для тебя важно в отношениях?",
    "Чем ты увлекаешься в свободное время?",
];

pub const CLOSER_QUESTIONS: [&str; 3] = [
    "Какой момент ты считаешь самым важным в нашем общении?",
    "Что тебе нравится в нашем диалоге?",
    "Как часто ты думаешь о наших разговорах?",
];

pub const EVEN_CLOSER_QUESTIONS: [&str; 3] = [
    "Что бы ты хотел(а) узнать обо мне больше всего?",
    "Какие твои самые глубокие желания?",
    "Что делает тебя по-настоящему счастливым(ой)?",
];

pub const INNER_WORLD_QUESTIONS: [&str; 3] = [
    "Какие мысли тебя занимают последнее время?",
    "Что для тебя значит быть собой?",
    "Какие чувства ты испытываешь прямо сейчас?",
];

/// The 36 closeness-building questions, asked strictly in this order.
pub const DEEP_QUESTIONS: [&str; 36] = [
    // Set 1
    "Если бы вы могли выбрать кого угодно в мире, кого бы вы пригласили на ужин?",
    "Хотели бы вы быть знаменитым? Каким образом?",
    "Прежде чем позвонить по телефону, вы когда-нибудь репетируете то, что собираетесь сказать? Почему?",
    "Что для вас было бы \"идеальным\" днем?",
    "Когда вы в последний раз пели для себя? А для кого-то другого?",
    "Если бы вы могли дожить до 90 лет и сохранить либо разум, либо тело 30-летнего на последние 60 лет вашей жизни, что бы вы выбрали?",
    "У вас есть тайное предчувствие о том, как вы умрёте?",
    "Назовите три общие черты между вами и вашим партнёром.",
    "За что в своей жизни вы больше всего благодарны?",
    "Если бы вы могли что-то изменить в том, как вас воспитывали, что бы это было?",
    "В течение 4 минут расскажите своему партнёру историю своей жизни как можно подробнее.",
    "Если бы вы могли проснуться завтра, обладая каким-либо качеством или способностью, что бы это было?",
    // Set 2
    "Если бы хрустальный шар мог рассказать вам правду о себе, вашей жизни, будущем или о чём-то ещё, что бы вы хотели узнать?",
    "Есть ли что-то, о чём вы давно мечтаете? Почему вы этого не сделали?",
    "Какое самое большое достижение в вашей жизни?",
    "Что вы больше всего цените в дружбе?",
    "Какое ваше самое ценное воспоминание?",
    "Какое ваше самое ужасное воспоминание?",
    "Если бы вы знали, что через год внезапно умрёте, изменили бы вы что-нибудь в своей жизни? Почему?",
    "Что значит дружба для вас?",
    "Какую роль играют любовь и привязанность в вашей жизни?",
    "По очереди поделитесь тем, что считаете положительными качествами своего партнёра. Поделитесь пятью пунктами.",
    "Насколько близки и тёплы отношения в вашей семье? Считаете ли вы своё детство более счастливым, чем у большинства людей?",
    "Как вы относитесь к своим отношениям с матерью?",
    // Set 3
    "Произнесите три истинных утверждения, используя \"мы\". Например, \"Мы оба находимся в этой комнате и чувствуем...\"",
    "Закончите это предложение: \"Хотел бы я, чтобы у меня был кто-то, с кем я мог бы разделить...\"",
    "Если бы вы собирались стать близким другом со своим партнёром, пожалуйста, поделитесь тем, что было бы важно для него или неё знать.",
    "Расскажите партнёру, что вам в нём или в ней нравится; будьте на этот раз очень честными, говоря то, что не сказали бы кому-то, с кем только что познакомились.",
    "Поделитесь с партнёром неловким моментом в вашей жизни.",
    "Когда вы в последний раз плакали перед другим человеком? А в одиночестве?",
    "Расскажите партнёру, что вам в нём или в ней уже нравится.",
    "Что для вас слишком серьёзно, чтобы шутить об этом?",
    "Если бы вы должны были умереть сегодня вечером без возможности поговорить с кем-либо, о чём вы больше всего сожалели бы, что не сказали кому-то? Почему вы до сих пор не сказали им это?",
    "Ваш дом со всем, что у вас есть, загорается. После спасения близких и домашних животных у вас есть время, чтобы безопасно совершить последний рывок и спасти один предмет. Что это было бы? Почему?",
    "Из всех людей в вашей семье, чья смерть была бы для вас самой тяжёлой? Почему?",
    "Поделитесь личной проблемой и спросите у партнёра совета о том, как он или она справились бы с ней. Также попросите партнёра рассказать вам, как, по его или её мнению, вы относитесь к выбранной вами проблеме.",
];

pub fn category_pool(category: QuestionCategory) -> &'static [&'static str] {
    match category {
        QuestionCategory::Closer => &CLOSER_QUESTIONS,
        QuestionCategory::EvenCloser => &EVEN_CLOSER_QUESTIONS,
        QuestionCategory::InnerWorld => &INNER_WORLD_QUESTIONS,
    }
}

pub fn random_intuition_question() -> &'static str {
    pick(&INTUITION_QUESTIONS)
}

pub fn random_category_question(category: QuestionCategory) -> &'static str {
    pick(category_pool(category))
}

fn pick(pool: &'static [&'static str]) -> &'static str {
    pool.choose(&mut rand::thread_rng()).copied().unwrap_or_default()
}
